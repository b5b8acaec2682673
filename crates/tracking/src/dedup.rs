//! Time-windowed alert deduplication

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Fingerprint → last-alerted cache.
///
/// The window is anchored to the last dispatched alert, not the last
/// attempt: a suppressed duplicate does not refresh the stored timestamp.
#[derive(Debug)]
pub struct DedupStore {
    window: Duration,
    entries: HashMap<String, DateTime<Utc>>,
}

impl DedupStore {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
            entries: HashMap::new(),
        }
    }

    /// Returns true and records `now` iff no alert for this fingerprint
    /// was dispatched within the window. Lazily evicts stale entries so
    /// fingerprints that never recur are not retained forever.
    pub fn admit_once(&mut self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        if let Some(&last) = self.entries.get(fingerprint) {
            if now - last < self.window {
                debug!(fingerprint, "duplicate suppressed");
                return false;
            }
        }
        self.entries.insert(fingerprint.to_string(), now);

        // Entries past twice the window can never suppress again.
        let cutoff = now - self.window * 2;
        self.entries.retain(|_, &mut last| last > cutoff);
        true
    }

    /// Drop a fingerprint so the next occurrence alerts regardless of the
    /// window (used when a recovered entity re-arms its timeout alert).
    pub fn forget(&mut self, fingerprint: &str) {
        self.entries.remove(fingerprint);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}
