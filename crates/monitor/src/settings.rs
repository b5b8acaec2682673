//! Configuration surface

use alerting::TelegramSettings;
use filtering::FilterSettings;
use ingest::MqttSettings;
use serde::Deserialize;

/// Liveness monitoring and post-stop silence knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringSettings {
    /// Seconds of silence after the last liveness signal before an
    /// entity is considered timed out.
    #[serde(default = "default_liveness_timeout_secs")]
    pub liveness_timeout_secs: u64,
    /// How often the liveness monitor scans tracked entities.
    #[serde(default = "default_liveness_check_interval_secs")]
    pub liveness_check_interval_secs: u64,
    /// Seconds past a stop before post-stop silence kicks in.
    #[serde(default)]
    pub post_stop_silence_grace_secs: u64,
}

fn default_liveness_timeout_secs() -> u64 {
    300
}

fn default_liveness_check_interval_secs() -> u64 {
    60
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            liveness_timeout_secs: default_liveness_timeout_secs(),
            liveness_check_interval_secs: default_liveness_check_interval_secs(),
            post_stop_silence_grace_secs: 0,
        }
    }
}

/// Top-level configuration, loaded from a file plus environment
/// overrides. Invalid values (bad regex, enabled notifier without
/// credentials) are rejected at startup, before any message flows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mqtt: MqttSettings,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    #[serde(default)]
    pub telegram: TelegramSettings,
}

impl Settings {
    /// Load configuration from the given file (any format the `config`
    /// crate recognizes), then apply `BOTWATCH__`-prefixed environment
    /// overrides (e.g. `BOTWATCH__MQTT__HOST`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path)),
            None => builder.add_source(config::File::with_name("config").required(false)),
        };
        builder
            .add_source(config::Environment::with_prefix("BOTWATCH").separator("__"))
            .build()?
            .try_deserialize()
    }
}
