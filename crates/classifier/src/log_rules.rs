//! Ordered log-channel detection rules

use events::{Event, EventKind, RawMessage, Severity};
use tracing::debug;

use crate::prefix;

/// One detection rule: a cheap predicate over the lower-cased payload and
/// a constructor that may still decline (failed extraction falls through).
struct LogRule {
    name: &'static str,
    matches: fn(&str) -> bool,
    build: fn(&RawMessage, &str) -> Option<Event>,
}

/// Evaluated in order, first successful construction wins.
const LOG_RULES: &[LogRule] = &[
    LogRule {
        name: "global_drawdown",
        matches: |lower| lower.contains("global drawdown reached"),
        build: build_global_drawdown,
    },
    LogRule {
        name: "controller_drawdown",
        matches: |lower| lower.contains("controller") && lower.contains("reached max drawdown"),
        build: build_controller_drawdown,
    },
    LogRule {
        name: "generic_drawdown",
        matches: |lower| lower.contains("drawdown"),
        build: build_generic_drawdown,
    },
    LogRule {
        name: "clean_stop",
        matches: |lower| {
            lower.contains("strategy stopped successfully") || lower.contains("bot stopped")
        },
        build: build_clean_stop,
    },
    LogRule {
        name: "declared_severity",
        matches: |_| true,
        build: build_declared_severity,
    },
];

/// Classify a log-channel message against the rule table.
pub fn classify_log(msg: &RawMessage) -> Option<Event> {
    let lower = msg.payload.to_lowercase();
    for rule in LOG_RULES {
        if (rule.matches)(&lower) {
            if let Some(event) = (rule.build)(msg, &lower) {
                debug!(entity = %msg.entity_id, rule = rule.name, "log message classified");
                return Some(event);
            }
        }
    }
    None
}

fn build_global_drawdown(msg: &RawMessage, _lower: &str) -> Option<Event> {
    // ERROR regardless of the declared severity field.
    Some(Event {
        kind: EventKind::GlobalThresholdBreach,
        entity_id: msg.entity_id.clone(),
        severity: Severity::Error,
        fingerprint: format!("{}:global_drawdown", msg.entity_id),
        detail: msg.payload.clone(),
        source_channel: msg.channel,
        source: msg.source_topic.clone(),
        occurred_at: msg.received_at,
    })
}

fn build_controller_drawdown(msg: &RawMessage, _lower: &str) -> Option<Event> {
    // Extraction works on the original casing; a malformed marker falls
    // through to the generic drawdown rule.
    let scope_id = extract_scope(&msg.payload)?;
    Some(Event {
        kind: EventKind::ScopedThresholdBreach {
            scope_id: scope_id.clone(),
        },
        entity_id: msg.entity_id.clone(),
        severity: Severity::Warning,
        fingerprint: format!("{}:controller_drawdown:{}", msg.entity_id, scope_id),
        detail: msg.payload.clone(),
        source_channel: msg.channel,
        source: msg.source_topic.clone(),
        occurred_at: msg.received_at,
    })
}

fn build_generic_drawdown(msg: &RawMessage, _lower: &str) -> Option<Event> {
    Some(Event {
        kind: EventKind::GenericError,
        entity_id: msg.entity_id.clone(),
        severity: Severity::Warning,
        fingerprint: format!("{}:drawdown:{}", msg.entity_id, prefix(&msg.payload, 50)),
        detail: msg.payload.clone(),
        source_channel: msg.channel,
        source: msg.source_topic.clone(),
        occurred_at: msg.received_at,
    })
}

fn build_clean_stop(msg: &RawMessage, _lower: &str) -> Option<Event> {
    Some(Event {
        kind: EventKind::LifecycleStopped,
        entity_id: msg.entity_id.clone(),
        severity: Severity::Warning,
        // Destination-status fingerprint, shared with status-channel stops
        // so the two sources dedup against each other.
        fingerprint: format!("{}:status:offline", msg.entity_id),
        detail: msg.payload.clone(),
        source_channel: msg.channel,
        source: msg.source_topic.clone(),
        occurred_at: msg.received_at,
    })
}

fn build_declared_severity(msg: &RawMessage, _lower: &str) -> Option<Event> {
    let severity = msg.declared_severity?;
    if severity < Severity::Warning {
        return None;
    }
    Some(Event {
        kind: EventKind::GenericError,
        entity_id: msg.entity_id.clone(),
        severity,
        fingerprint: format!("{}:log:{}", msg.entity_id, prefix(&msg.payload, 100)),
        detail: msg.payload.clone(),
        source_channel: msg.channel,
        source: msg.source_topic.clone(),
        occurred_at: msg.received_at,
    })
}

/// Scope token between the literal markers `"Controller "` and `" reached"`.
fn extract_scope(payload: &str) -> Option<String> {
    let after = payload.split("Controller ").nth(1)?;
    let scope = after.split(" reached").next()?.trim();
    if scope.is_empty() {
        None
    } else {
        Some(scope.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::msg;
    use events::Channel;

    fn log(payload: &str) -> RawMessage {
        msg(Channel::Log, "bot-1", payload)
    }

    #[test]
    fn test_global_drawdown_is_error_regardless_of_declared_level() {
        let mut message = log("Global drawdown reached. Stopping the strategy.");
        message.declared_severity = Some(Severity::Info);
        let event = classify_log(&message).unwrap();
        assert_eq!(event.kind, EventKind::GlobalThresholdBreach);
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.fingerprint, "bot-1:global_drawdown");
    }

    #[test]
    fn test_controller_drawdown_extracts_scope() {
        let event = classify_log(&log(
            "Controller bearish_gate_200bp_0.1 reached max drawdown. Stopping the controller.",
        ))
        .unwrap();
        assert_eq!(
            event.kind,
            EventKind::ScopedThresholdBreach {
                scope_id: "bearish_gate_200bp_0.1".to_string()
            }
        );
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(
            event.fingerprint,
            "bot-1:controller_drawdown:bearish_gate_200bp_0.1"
        );
    }

    #[test]
    fn test_malformed_controller_marker_falls_through_to_generic_drawdown() {
        // Predicate matches (lower-cased tokens present) but the cased
        // marker "Controller " is absent, so extraction declines.
        let event = classify_log(&log("the controller reached max drawdown limits")).unwrap();
        assert_eq!(event.kind, EventKind::GenericError);
        assert_eq!(event.severity, Severity::Warning);
        assert!(event.fingerprint.starts_with("bot-1:drawdown:"));
    }

    #[test]
    fn test_generic_drawdown_fingerprint_uses_payload_prefix() {
        let event = classify_log(&log("drawdown watermark moving")).unwrap();
        assert_eq!(event.fingerprint, "bot-1:drawdown:drawdown watermark moving");
    }

    #[test]
    fn test_clean_stop_phrase_is_lifecycle_stop() {
        let event = classify_log(&log("Strategy stopped successfully.")).unwrap();
        assert_eq!(event.kind, EventKind::LifecycleStopped);
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.fingerprint, "bot-1:status:offline");
    }

    #[test]
    fn test_plain_error_log_becomes_generic_event() {
        let mut message = log("Connection handshake rejected by exchange");
        message.declared_severity = Some(Severity::Error);
        let event = classify_log(&message).unwrap();
        assert_eq!(event.kind, EventKind::GenericError);
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(
            event.fingerprint,
            "bot-1:log:Connection handshake rejected by exchange"
        );
    }

    #[test]
    fn test_plain_info_log_yields_nothing() {
        let mut message = log("tick processed");
        message.declared_severity = Some(Severity::Info);
        assert!(classify_log(&message).is_none());
        // No declared severity at all yields nothing either.
        assert!(classify_log(&log("tick processed")).is_none());
    }

    #[test]
    fn test_global_rule_wins_over_controller_rule() {
        let event = classify_log(&log(
            "Global drawdown reached after Controller alpha reached max drawdown",
        ))
        .unwrap();
        assert_eq!(event.kind, EventKind::GlobalThresholdBreach);
    }
}
