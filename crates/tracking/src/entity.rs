//! Per-entity lifecycle and liveness state

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Last known lifecycle status of a monitored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

/// State for one observed entity. Created on first reference, garbage
/// collected only by process restart.
///
/// Invariant: `offline_since` is `Some` exactly while `last_status` is
/// `Offline`, and cleared on the transition back to `Online`.
#[derive(Debug, Clone, Default)]
pub struct EntityState {
    pub last_liveness_at: Option<DateTime<Utc>>,
    pub last_status: EntityStatus,
    pub offline_since: Option<DateTime<Utc>>,
    pub timeout_already_alerted: bool,
}

/// All per-entity state, keyed by opaque entity id.
#[derive(Debug, Default)]
pub struct EntityStateStore {
    entities: HashMap<String, EntityState>,
}

impl EntityStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known status; `Unknown` for entities never seen before.
    pub fn status(&self, entity_id: &str) -> EntityStatus {
        self.entities
            .get(entity_id)
            .map(|state| state.last_status)
            .unwrap_or_default()
    }

    /// Record a liveness signal. Clears the timeout-alerted flag so a
    /// later gap can alert again.
    pub fn record_liveness(&mut self, entity_id: &str, now: DateTime<Utc>) {
        let state = self.entry(entity_id);
        state.last_liveness_at = Some(now);
        state.timeout_already_alerted = false;
        debug!(entity = entity_id, "liveness signal recorded");
    }

    /// Transition an entity to ONLINE: clears post-stop silence and
    /// re-arms liveness alerting.
    pub fn mark_online(&mut self, entity_id: &str) {
        let state = self.entry(entity_id);
        state.last_status = EntityStatus::Online;
        state.offline_since = None;
        state.timeout_already_alerted = false;
    }

    /// Transition an entity to OFFLINE. Silence starts `grace_secs` past
    /// the transition time.
    pub fn mark_offline(&mut self, entity_id: &str, at: DateTime<Utc>, grace_secs: u64) {
        let state = self.entry(entity_id);
        state.last_status = EntityStatus::Offline;
        state.offline_since = Some(at + Duration::seconds(grace_secs as i64));
    }

    /// Mark the liveness timeout for this entity as already alerted.
    pub fn set_timeout_alerted(&mut self, entity_id: &str) {
        self.entry(entity_id).timeout_already_alerted = true;
    }

    /// Post-stop silence predicate: true when the entity is offline and
    /// the given time falls at or after the silence start. Applies only
    /// to non-lifecycle events; the caller enforces that exemption.
    pub fn silenced(&self, entity_id: &str, at: DateTime<Utc>) -> bool {
        match self.entities.get(entity_id) {
            Some(state) => match state.offline_since {
                Some(since) => at >= since,
                None => false,
            },
            None => false,
        }
    }

    /// Iterate all tracked entities (liveness monitor scan).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntityState)> {
        self.entities.iter().map(|(id, state)| (id.as_str(), state))
    }

    fn entry(&mut self, entity_id: &str) -> &mut EntityState {
        self.entities.entry(entity_id.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_unseen_entity_is_unknown() {
        let store = EntityStateStore::new();
        assert_eq!(store.status("bot-1"), EntityStatus::Unknown);
        assert!(!store.silenced("bot-1", at(100)));
    }

    #[test]
    fn test_offline_sets_silence_and_online_clears_it() {
        let mut store = EntityStateStore::new();
        store.mark_offline("bot-1", at(100), 0);
        assert_eq!(store.status("bot-1"), EntityStatus::Offline);
        assert!(store.silenced("bot-1", at(100)));
        assert!(store.silenced("bot-1", at(101)));
        // Events dated before the stop are not silenced.
        assert!(!store.silenced("bot-1", at(99)));

        store.mark_online("bot-1");
        assert_eq!(store.status("bot-1"), EntityStatus::Online);
        assert!(!store.silenced("bot-1", at(200)));
    }

    #[test]
    fn test_grace_extends_silence_start() {
        let mut store = EntityStateStore::new();
        store.mark_offline("bot-1", at(100), 30);
        assert!(!store.silenced("bot-1", at(120)));
        assert!(store.silenced("bot-1", at(130)));
    }

    #[test]
    fn test_liveness_signal_rearms_timeout_alert() {
        let mut store = EntityStateStore::new();
        store.record_liveness("bot-1", at(100));
        store.set_timeout_alerted("bot-1");

        store.record_liveness("bot-1", at(500));
        let (_, state) = store.iter().next().unwrap();
        assert!(!state.timeout_already_alerted);
        assert_eq!(state.last_liveness_at, Some(at(500)));
    }
}
