//! Liveness monitor
//!
//! Periodically scans tracked entities for ones whose last liveness
//! signal has aged past the timeout and synthesizes `LivenessTimeout`
//! events into the same dedup/format/dispatch path as classified
//! events. An entity that never sent a signal is never alerted; only a
//! prior signal followed by silence is evidence of a problem.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, warn};

use alerting::{AlertFormatter, OutboundAlert};
use events::{Channel, Event, EventKind, Severity};
use tracking::{EntityStatus, MonitorState};

use crate::settings::MonitoringSettings;

/// Dedup key for an entity's timeout alert; forgotten when a liveness
/// signal or an ONLINE transition re-arms the entity.
pub(crate) fn liveness_fingerprint(entity_id: &str) -> String {
    format!("{}:liveness_timeout", entity_id)
}

pub struct LivenessMonitor {
    state: Arc<Mutex<MonitorState>>,
    formatter: AlertFormatter,
    alerts: mpsc::Sender<OutboundAlert>,
    timeout: Duration,
    check_interval: StdDuration,
    post_stop_grace_secs: u64,
    /// Synthetic source label, e.g. `hbot/+/hb (timeout)`.
    source_label: String,
}

impl LivenessMonitor {
    pub fn new(
        state: Arc<Mutex<MonitorState>>,
        formatter: AlertFormatter,
        alerts: mpsc::Sender<OutboundAlert>,
        monitoring: &MonitoringSettings,
        topic_root: &str,
    ) -> Self {
        Self {
            state,
            formatter,
            alerts,
            timeout: Duration::seconds(monitoring.liveness_timeout_secs as i64),
            check_interval: StdDuration::from_secs(monitoring.liveness_check_interval_secs),
            post_stop_grace_secs: monitoring.post_stop_silence_grace_secs,
            source_label: format!("{}/+/hb (timeout)", topic_root),
        }
    }

    /// Tick forever on the configured period.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately; skip it so a fresh start
        // does not scan an empty store.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for alert in self.scan(Utc::now()).await {
                if self.alerts.send(alert).await.is_err() {
                    error!("dispatcher closed, liveness monitor stopping");
                    return;
                }
            }
        }
    }

    /// One scan pass. Takes the shared state lock, returns the alerts to
    /// dispatch after the lock is released.
    pub async fn scan(&self, now: DateTime<Utc>) -> Vec<OutboundAlert> {
        let mut state = self.state.lock().await;

        let overdue: Vec<(String, DateTime<Utc>, bool)> = state
            .entities
            .iter()
            .filter_map(|(id, entity)| {
                let last_seen = entity.last_liveness_at?;
                if entity.timeout_already_alerted {
                    return None;
                }
                if now - last_seen > self.timeout {
                    Some((
                        id.to_string(),
                        last_seen,
                        entity.last_status == EntityStatus::Offline,
                    ))
                } else {
                    None
                }
            })
            .collect();

        let mut alerts = Vec::new();
        for (entity_id, last_seen, was_offline) in overdue {
            warn!(entity = %entity_id, "liveness timeout");
            let event = self.timeout_event(&entity_id, last_seen, was_offline, now);
            if !state.dedup.admit_once(&event.fingerprint, now) {
                continue;
            }
            state.entities.set_timeout_alerted(&entity_id);
            // A silent entity is treated as stopped: mute its follow-up
            // noise until it comes back online.
            state
                .entities
                .mark_offline(&entity_id, now, self.post_stop_grace_secs);
            alerts.push(OutboundAlert {
                entity_id,
                text: self.formatter.render(&event),
            });
        }
        alerts
    }

    fn timeout_event(
        &self,
        entity_id: &str,
        last_seen: DateTime<Utc>,
        was_offline: bool,
        now: DateTime<Utc>,
    ) -> Event {
        let ago = elapsed_display(now - last_seen);
        let detail = if was_offline {
            format!(
                "Last liveness signal: {}. Entity was already reported offline; \
                 it appears to have crashed or stopped unexpectedly.",
                ago
            )
        } else {
            format!(
                "Last liveness signal: {}. Entity may have crashed or lost connectivity.",
                ago
            )
        };
        Event {
            kind: EventKind::LivenessTimeout,
            entity_id: entity_id.to_string(),
            severity: Severity::Warning,
            fingerprint: liveness_fingerprint(entity_id),
            detail,
            source_channel: Channel::Liveness,
            source: self.source_label.clone(),
            occurred_at: now,
        }
    }
}

fn elapsed_display(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    if secs >= 60 {
        format!("{:.1} minutes ago", secs as f64 / 60.0)
    } else {
        format!("{} seconds ago", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    struct Harness {
        monitor: LivenessMonitor,
        state: Arc<Mutex<MonitorState>>,
        rx: mpsc::Receiver<OutboundAlert>,
    }

    fn harness(timeout_secs: u64) -> Harness {
        let state = Arc::new(Mutex::new(MonitorState::new(600)));
        let (tx, rx) = mpsc::channel(16);
        let monitor = LivenessMonitor::new(
            state.clone(),
            AlertFormatter::new(false, HashMap::new()),
            tx,
            &MonitoringSettings {
                liveness_timeout_secs: timeout_secs,
                liveness_check_interval_secs: 60,
                post_stop_silence_grace_secs: 0,
            },
            "hbot",
        );
        Harness { monitor, state, rx }
    }

    #[tokio::test]
    async fn test_gap_past_timeout_alerts_exactly_once() {
        let h = harness(300);
        h.state.lock().await.entities.record_liveness("bot-1", at(0));

        // 301 seconds of silence: one timeout alert.
        let alerts = h.monitor.scan(at(301)).await;
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].text.contains("Heartbeat Timeout"));
        assert!(alerts[0].text.contains("5.0 minutes ago"));

        // Still silent on the next tick: flag prevents a repeat.
        assert!(h.monitor.scan(at(361)).await.is_empty());
        drop(h.rx);
    }

    #[tokio::test]
    async fn test_liveness_recovery_rearms_a_second_alert() {
        let h = harness(300);
        h.state.lock().await.entities.record_liveness("bot-1", at(0));
        assert_eq!(h.monitor.scan(at(301)).await.len(), 1);

        // Signal arrives: flag and dedup entry cleared.
        {
            let mut state = h.state.lock().await;
            state.entities.record_liveness("bot-1", at(400));
            state.dedup.forget(&liveness_fingerprint("bot-1"));
        }

        // A fresh 301-second gap alerts again.
        assert!(h.monitor.scan(at(500)).await.is_empty());
        assert_eq!(h.monitor.scan(at(702)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_entity_without_any_signal_never_alerts() {
        let h = harness(300);
        // Tracked via a status update, but no liveness signal ever.
        h.state.lock().await.entities.mark_online("bot-1");
        assert!(h.monitor.scan(at(10_000)).await.is_empty());
    }

    #[tokio::test]
    async fn test_gap_shorter_than_timeout_is_quiet() {
        let h = harness(300);
        h.state.lock().await.entities.record_liveness("bot-1", at(0));
        assert!(h.monitor.scan(at(299)).await.is_empty());
        assert!(h.monitor.scan(at(300)).await.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_marks_entity_offline() {
        let h = harness(300);
        h.state.lock().await.entities.record_liveness("bot-1", at(0));
        h.monitor.scan(at(301)).await;

        let state = h.state.lock().await;
        assert_eq!(state.entities.status("bot-1"), EntityStatus::Offline);
        assert!(state.entities.silenced("bot-1", at(302)));
    }

    #[tokio::test]
    async fn test_crash_wording_when_already_offline() {
        let h = harness(300);
        {
            let mut state = h.state.lock().await;
            state.entities.record_liveness("bot-1", at(0));
            state.entities.mark_offline("bot-1", at(10), 0);
        }
        let alerts = h.monitor.scan(at(301)).await;
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].text.contains("crashed or stopped unexpectedly"));
    }

    #[test]
    fn test_elapsed_display_units() {
        assert_eq!(elapsed_display(Duration::seconds(45)), "45 seconds ago");
        assert_eq!(elapsed_display(Duration::seconds(90)), "1.5 minutes ago");
    }
}
