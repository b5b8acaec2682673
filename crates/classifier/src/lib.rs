//! Event Classification
//!
//! Turns an admitted raw message into zero or one canonical [`Event`].
//! Log-channel detection is an ordered list of (predicate, constructor)
//! rules evaluated first-match-wins; a constructor may decline (failed
//! extraction) and fall through to the next rule, so ordering and
//! fall-through are unit-testable per rule.

mod log_rules;
mod status;

pub use log_rules::classify_log;
pub use status::{classify_status, normalize_status};

use events::{Channel, Event, EventKind, RawMessage, Severity};
use tracking::EntityStatus;

/// Classify a message. `last_status` is the entity's previous lifecycle
/// status, needed only for status-channel transition detection.
pub fn classify(msg: &RawMessage, last_status: EntityStatus) -> Option<Event> {
    match msg.channel {
        Channel::Log => classify_log(msg),
        Channel::Status => classify_status(msg, last_status),
        Channel::Notify | Channel::Event => classify_notice(msg),
        // Liveness payloads only refresh entity state; never classified.
        Channel::Liveness => None,
    }
}

/// Notify/events payloads that survived the keyword gate are noteworthy
/// by definition; they become generic events keyed on a payload prefix.
pub fn classify_notice(msg: &RawMessage) -> Option<Event> {
    Some(Event {
        kind: EventKind::GenericError,
        entity_id: msg.entity_id.clone(),
        severity: msg.declared_severity.unwrap_or(Severity::Info),
        fingerprint: format!(
            "{}:{}:{}",
            msg.entity_id,
            msg.channel.topic_segment(),
            prefix(&msg.payload, 100)
        ),
        detail: msg.payload.clone(),
        source_channel: msg.channel,
        source: msg.source_topic.clone(),
        occurred_at: msg.received_at,
    })
}

/// First `max` characters of a string, on a char boundary.
pub(crate) fn prefix(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};
    use events::{Channel, RawMessage};

    pub fn msg(channel: Channel, entity: &str, payload: &str) -> RawMessage {
        RawMessage {
            channel,
            entity_id: entity.to_string(),
            payload: payload.to_string(),
            declared_severity: None,
            source_topic: format!("hbot/{}/{}", entity, channel.topic_segment()),
            received_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::msg;
    use super::*;

    #[test]
    fn test_liveness_never_classified() {
        assert!(classify(&msg(Channel::Liveness, "bot-1", "hb"), EntityStatus::Unknown).is_none());
    }

    #[test]
    fn test_notify_becomes_generic_event() {
        let event = classify(
            &msg(Channel::Notify, "bot-1", "Order failed to place"),
            EntityStatus::Unknown,
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::GenericError);
        assert_eq!(event.severity, Severity::Info);
        assert_eq!(event.fingerprint, "bot-1:notify:Order failed to place");
    }

    #[test]
    fn test_prefix_respects_char_boundaries() {
        assert_eq!(prefix("héllo", 2), "hé");
        assert_eq!(prefix("ab", 100), "ab");
    }
}
