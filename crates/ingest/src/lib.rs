//! MQTT Ingest
//!
//! Owns the inbound side of the system: broker connection, topic
//! subscriptions with reconnect/resubscribe, topic parsing into
//! `(entity_id, channel)`, and payload decoding into [`events::RawMessage`].
//! Decoded messages are handed to the pipeline over an mpsc channel.

mod decode;
mod mqtt;
mod topic;

pub use decode::decode_payload;
pub use mqtt::{MqttIngest, MqttSettings, Subscription};
pub use topic::parse_topic;
