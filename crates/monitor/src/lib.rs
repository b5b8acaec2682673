//! Monitor Service
//!
//! Wires the pieces together: configuration loading and validation,
//! the message-handling pipeline, and the periodic liveness monitor.

mod liveness;
mod pipeline;
pub mod settings;

pub use liveness::LivenessMonitor;
pub use pipeline::Pipeline;
pub use settings::{MonitoringSettings, Settings};

use tracing_subscriber::EnvFilter;

/// Initialize structured logging. `RUST_LOG` overrides the default level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
