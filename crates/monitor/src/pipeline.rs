//! Message-handling pipeline
//!
//! filter → classify → post-stop silence → dedup gate → state update →
//! format → dispatch. Messages are handled one at a time in arrival
//! order; all state mutation happens under one lock, which is released
//! before the alert is handed to the dispatcher channel.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use alerting::{AlertFormatter, OutboundAlert};
use events::{Channel, Event, EventKind, RawMessage};
use filtering::FilterPipeline;
use tracking::MonitorState;

use crate::liveness::liveness_fingerprint;

pub struct Pipeline {
    filters: FilterPipeline,
    formatter: AlertFormatter,
    state: Arc<Mutex<MonitorState>>,
    alerts: mpsc::Sender<OutboundAlert>,
    post_stop_grace_secs: u64,
}

impl Pipeline {
    pub fn new(
        filters: FilterPipeline,
        formatter: AlertFormatter,
        state: Arc<Mutex<MonitorState>>,
        alerts: mpsc::Sender<OutboundAlert>,
        post_stop_grace_secs: u64,
    ) -> Self {
        Self {
            filters,
            formatter,
            state,
            alerts,
            post_stop_grace_secs,
        }
    }

    /// Drain the transport channel until it closes.
    pub async fn run(self, mut rx: mpsc::Receiver<RawMessage>) {
        while let Some(msg) = rx.recv().await {
            self.handle_message(msg).await;
        }
    }

    /// Process one raw message end to end. Per-message failures never
    /// propagate; the worst outcome is a dropped alert.
    pub async fn handle_message(&self, msg: RawMessage) {
        if !self.filters.admit(&msg) {
            return;
        }

        // Liveness signals only refresh entity state; they re-arm the
        // timeout alert and its dedup entry, never produce events.
        if msg.channel == Channel::Liveness {
            let mut state = self.state.lock().await;
            state.entities.record_liveness(&msg.entity_id, msg.received_at);
            state.dedup.forget(&liveness_fingerprint(&msg.entity_id));
            return;
        }

        let alert = {
            let mut state = self.state.lock().await;
            let last_status = state.entities.status(&msg.entity_id);
            match classifier::classify(&msg, last_status) {
                Some(event) => self.gate_and_apply(&mut state, event),
                None => None,
            }
        };

        if let Some(alert) = alert {
            if self.alerts.send(alert).await.is_err() {
                error!("dispatcher closed, alert dropped");
            }
        }
    }

    /// Tail of the pipeline: silence check, dedup gate, entity state
    /// update, render. Must be called with the state lock held.
    fn gate_and_apply(&self, state: &mut MonitorState, event: Event) -> Option<OutboundAlert> {
        // Lifecycle events are never silenced; everything else is muted
        // from offline_since (plus grace) until the entity comes back.
        if !event.kind.is_lifecycle()
            && state.entities.silenced(&event.entity_id, event.occurred_at)
        {
            debug!(entity = %event.entity_id, "suppressed post-stop");
            return None;
        }

        if !state.dedup.admit_once(&event.fingerprint, event.occurred_at) {
            return None;
        }

        match &event.kind {
            EventKind::LifecycleStarted => {
                state.entities.mark_online(&event.entity_id);
                state.dedup.forget(&liveness_fingerprint(&event.entity_id));
            }
            EventKind::LifecycleStopped => {
                state
                    .entities
                    .mark_offline(&event.entity_id, event.occurred_at, self.post_stop_grace_secs);
            }
            _ => {}
        }

        Some(OutboundAlert {
            entity_id: event.entity_id.clone(),
            text: self.formatter.render(&event),
        })
    }
}
