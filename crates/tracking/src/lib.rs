//! State Tracking
//!
//! Mutable pipeline state, exclusively owned by the core:
//! - `EntityStateStore`: per-entity liveness and lifecycle state
//! - `DedupStore`: time-windowed fingerprint → last-alerted cache
//!
//! Both live behind a single lock (`MonitorState`) shared between the
//! message-handling path and the liveness monitor task.

mod dedup;
mod entity;

pub use dedup::DedupStore;
pub use entity::{EntityState, EntityStateStore, EntityStatus};

/// All mutable pipeline state, guarded by one lock at the call site.
#[derive(Debug)]
pub struct MonitorState {
    pub entities: EntityStateStore,
    pub dedup: DedupStore,
}

impl MonitorState {
    pub fn new(dedup_window_secs: u64) -> Self {
        Self {
            entities: EntityStateStore::new(),
            dedup: DedupStore::new(dedup_window_secs),
        }
    }
}
