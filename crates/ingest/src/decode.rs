//! Payload decoding

use chrono::{DateTime, Utc};
use serde_json::Value;

use events::{normalize_epoch, Channel, RawMessage, Severity};

/// Decode an MQTT payload into a [`RawMessage`].
///
/// Payloads are JSON objects in the happy path (`msg`, `level_name`,
/// `timestamp`, and `type`/`data` for the events channel). Anything that
/// fails to parse degrades to the raw UTF-8 text with the receive time;
/// malformed input is never fatal.
pub fn decode_payload(
    channel: Channel,
    entity_id: &str,
    topic: &str,
    bytes: &[u8],
    now: DateTime<Utc>,
) -> RawMessage {
    let text = String::from_utf8_lossy(bytes).into_owned();

    let (payload, declared_severity, occurred_at) = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(fields)) => {
            let occurred_at = fields
                .get("timestamp")
                .and_then(Value::as_f64)
                .and_then(normalize_epoch)
                .unwrap_or(now);
            let declared = fields
                .get("level_name")
                .and_then(Value::as_str)
                .and_then(|level| level.parse::<Severity>().ok());
            let payload = match channel {
                Channel::Event => {
                    let kind = fields
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    let data = fields.get("data").cloned().unwrap_or(Value::Null);
                    format!("{}: {}", kind, data)
                }
                Channel::Status => fields
                    .get("msg")
                    .and_then(Value::as_str)
                    .filter(|msg| !msg.trim().is_empty())
                    // Some emitters put the status in `type` instead.
                    .or_else(|| fields.get("type").and_then(Value::as_str))
                    .unwrap_or_default()
                    .to_string(),
                _ => fields
                    .get("msg")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| text.clone()),
            };
            (payload, declared, occurred_at)
        }
        // A bare JSON string is the message itself, unquoted.
        Ok(Value::String(inner)) => (inner, None, now),
        _ => (text, None, now),
    };

    RawMessage {
        channel,
        entity_id: entity_id.to_string(),
        payload,
        declared_severity,
        source_topic: topic.to_string(),
        received_at: occurred_at,
    }
}
