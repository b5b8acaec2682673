//! Botwatch - MQTT Bot Monitor & Alert Service

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use alerting::{run_dispatcher, AlertFormatter, Notifier, TelegramNotifier};
use filtering::FilterPipeline;
use ingest::MqttIngest;
use monitor::{init_logging, LivenessMonitor, Pipeline, Settings};
use tracking::MonitorState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== Botwatch v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("CONFIG_PATH").ok();
    let settings =
        Settings::load(config_path.as_deref()).context("failed to load configuration")?;

    // Everything that can be invalid is rejected here, before the
    // pipeline accepts a single message.
    let filters =
        FilterPipeline::new(&settings.filters).context("invalid filter configuration")?;
    let notifier: Arc<dyn Notifier> = Arc::new(
        TelegramNotifier::new(settings.telegram.clone())
            .context("invalid telegram configuration")?,
    );
    let formatter = AlertFormatter::new(
        settings.telegram.use_markdown,
        settings.telegram.source_aliases.clone(),
    );

    let state = Arc::new(Mutex::new(MonitorState::new(
        settings.filters.dedup_window_secs,
    )));
    let (alert_tx, alert_rx) = mpsc::channel(256);
    let (msg_tx, msg_rx) = mpsc::channel(1024);

    tokio::spawn(run_dispatcher(alert_rx, notifier));
    tokio::spawn(
        LivenessMonitor::new(
            state.clone(),
            formatter.clone(),
            alert_tx.clone(),
            &settings.monitoring,
            &settings.mqtt.topic_root,
        )
        .run(),
    );
    tokio::spawn(MqttIngest::new(settings.mqtt.clone(), msg_tx).run());

    let pipeline = Pipeline::new(
        filters,
        formatter,
        state,
        alert_tx,
        settings.monitoring.post_stop_silence_grace_secs,
    );

    info!("monitor started");
    tokio::select! {
        _ = pipeline.run(msg_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            // In-flight dispatch is abandoned; delivery is best-effort.
            info!("shutting down");
        }
    }

    Ok(())
}
