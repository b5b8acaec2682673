//! Classified operational events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Channel, Severity};

/// What kind of operational event was detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// The whole strategy hit its global drawdown limit.
    GlobalThresholdBreach,
    /// A single named sub-unit (controller) hit its drawdown limit.
    ScopedThresholdBreach { scope_id: String },
    /// Entity reported itself running.
    LifecycleStarted,
    /// Entity reported itself stopped (status transition or stop log line).
    LifecycleStopped,
    /// Entity went quiet past the liveness timeout.
    LivenessTimeout,
    /// Anything else noteworthy enough to survive the filters.
    GenericError,
}

impl EventKind {
    /// Lifecycle events drive entity state transitions and are exempt from
    /// post-stop silence.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, EventKind::LifecycleStarted | EventKind::LifecycleStopped)
    }
}

/// A classified event, produced once by the classifier or the liveness
/// monitor and consumed once by the gate/format/dispatch path.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub entity_id: String,
    pub severity: Severity,
    /// Deduplication key. Stable across semantically identical recurrences,
    /// distinct across entities and scopes.
    pub fingerprint: String,
    /// Human-readable body used by the formatter.
    pub detail: String,
    pub source_channel: Channel,
    /// Topic (or synthetic label) the event originated from, for display.
    pub source: String,
    pub occurred_at: DateTime<Utc>,
}
