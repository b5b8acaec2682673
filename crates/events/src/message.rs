//! Raw transport messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical channel of a message, derived from the trailing topic segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Log,
    Status,
    Notify,
    Event,
    Liveness,
}

impl Channel {
    /// Map a topic segment (`log`, `status_updates`, `notify`, `events`, `hb`)
    /// to a channel. Unknown segments return `None` and are dropped upstream.
    pub fn from_topic_segment(segment: &str) -> Option<Self> {
        match segment {
            "log" => Some(Channel::Log),
            "status_updates" => Some(Channel::Status),
            "notify" => Some(Channel::Notify),
            "events" => Some(Channel::Event),
            "hb" => Some(Channel::Liveness),
            _ => None,
        }
    }

    /// The topic segment this channel is bound to.
    pub fn topic_segment(&self) -> &'static str {
        match self {
            Channel::Log => "log",
            Channel::Status => "status_updates",
            Channel::Notify => "notify",
            Channel::Event => "events",
            Channel::Liveness => "hb",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic_segment())
    }
}

/// Message severity as declared by the emitter or assigned by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ();

    /// Parse a `level_name` string. Unknown levels are treated as parse
    /// failures so callers can fall back to a default rather than guess.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" | "CRITICAL" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// A single message as delivered by the pub/sub transport, after topic
/// parsing and payload decoding. Transient; never persisted.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub channel: Channel,
    pub entity_id: String,
    /// Decoded textual payload (the `msg` field of a JSON payload, or the
    /// raw UTF-8 body when the payload is not JSON).
    pub payload: String,
    /// Severity declared in the payload, when present (log channel).
    pub declared_severity: Option<Severity>,
    /// Full topic the message arrived on, kept for display.
    pub source_topic: String,
    pub received_at: DateTime<Utc>,
}
