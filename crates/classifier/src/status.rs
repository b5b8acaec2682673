//! Status-channel transition detection

use events::{Event, EventKind, RawMessage, Severity};
use tracing::debug;
use tracking::EntityStatus;

const OFFLINE_TOKENS: &[&str] = &["offline", "stopped", "stop", "shutdown", "terminated"];
const ONLINE_TOKENS: &[&str] = &["online", "started", "running", "booted"];

/// Normalize a reported status string to a lifecycle bucket.
pub fn normalize_status(payload: &str) -> EntityStatus {
    let lower = payload.trim().to_lowercase();
    if OFFLINE_TOKENS.iter().any(|token| lower.contains(token)) {
        EntityStatus::Offline
    } else if ONLINE_TOKENS.iter().any(|token| lower.contains(token)) {
        EntityStatus::Online
    } else {
        EntityStatus::Unknown
    }
}

/// Compare the reported status against the last known one; only actual
/// transitions produce an event. Fingerprints are keyed on the
/// destination status so starts and stops never collide.
pub fn classify_status(msg: &RawMessage, last_status: EntityStatus) -> Option<Event> {
    let reported = normalize_status(&msg.payload);

    let (kind, severity, fingerprint) = match reported {
        EntityStatus::Online if last_status != EntityStatus::Online => (
            EventKind::LifecycleStarted,
            Severity::Info,
            format!("{}:status:online", msg.entity_id),
        ),
        EntityStatus::Offline if last_status == EntityStatus::Online => (
            EventKind::LifecycleStopped,
            Severity::Warning,
            format!("{}:status:offline", msg.entity_id),
        ),
        _ => {
            debug!(entity = %msg.entity_id, ?reported, ?last_status, "no status transition");
            return None;
        }
    };

    Some(Event {
        kind,
        entity_id: msg.entity_id.clone(),
        severity,
        fingerprint,
        detail: msg.payload.clone(),
        source_channel: msg.channel,
        source: msg.source_topic.clone(),
        occurred_at: msg.received_at,
    })
}
