//! Alert dispatch task

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::notifier::Notifier;

/// One formatted alert, ready for delivery.
#[derive(Debug, Clone)]
pub struct OutboundAlert {
    pub entity_id: String,
    pub text: String,
}

/// Consume formatted alerts and push them out, one delivery per event.
///
/// Runs as its own task so the pipeline never holds the state lock while
/// waiting on the network. Failed deliveries are logged and dropped;
/// stale alerts lose their value. The task ends when all senders drop.
pub async fn run_dispatcher(mut rx: mpsc::Receiver<OutboundAlert>, notifier: Arc<dyn Notifier>) {
    while let Some(alert) = rx.recv().await {
        match notifier.send(&alert.text).await {
            Ok(()) => info!(entity = %alert.entity_id, "alert dispatched"),
            Err(e) => error!(entity = %alert.entity_id, error = %e, "alert delivery failed, dropped"),
        }
    }
    info!("dispatcher shutting down");
}
