//! Canonical Data Model
//!
//! Shared types for the monitor pipeline:
//! - `RawMessage`: a topic-tagged message as delivered by the transport
//! - `Event`: a classified operational event with a deduplication fingerprint
//! - timestamp normalization helpers for epoch payload timestamps

mod event;
mod message;
mod time;

pub use event::{Event, EventKind};
pub use message::{Channel, RawMessage, Severity};
pub use time::normalize_epoch;
