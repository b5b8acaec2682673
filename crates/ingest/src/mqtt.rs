//! Broker connection and subscription loop

use std::time::Duration;

use chrono::Utc;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, Publish, QoS};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use events::RawMessage;

use crate::decode::decode_payload;
use crate::topic::parse_topic;

/// One topic subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub topic: String,
    #[serde(default = "default_qos")]
    pub qos: u8,
}

fn default_qos() -> u8 {
    1
}

/// MQTT section of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,
    /// Leading topic segment entities publish under.
    #[serde(default = "default_topic_root")]
    pub topic_root: String,
    /// Explicit subscriptions; empty means the five default wildcards.
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            client_id_prefix: default_client_id_prefix(),
            keepalive_secs: default_keepalive_secs(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
            topic_root: default_topic_root(),
            subscriptions: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "emqx".to_string()
}
fn default_port() -> u16 {
    1883
}
fn default_client_id_prefix() -> String {
    "hb-monitor".to_string()
}
fn default_keepalive_secs() -> u64 {
    60
}
fn default_reconnect_interval_secs() -> u64 {
    5
}
fn default_topic_root() -> String {
    "hbot".to_string()
}

impl MqttSettings {
    /// Configured subscriptions, or the default channel wildcards.
    pub fn effective_subscriptions(&self) -> Vec<Subscription> {
        if !self.subscriptions.is_empty() {
            return self.subscriptions.clone();
        }
        ["log", "notify", "status_updates", "events", "hb"]
            .into_iter()
            .map(|segment| Subscription {
                topic: format!("{}/+/{}", self.topic_root, segment),
                qos: 1,
            })
            .collect()
    }
}

/// Consumes the broker and feeds decoded messages into the pipeline.
pub struct MqttIngest {
    settings: MqttSettings,
    tx: mpsc::Sender<RawMessage>,
}

impl MqttIngest {
    pub fn new(settings: MqttSettings, tx: mpsc::Sender<RawMessage>) -> Self {
        Self { settings, tx }
    }

    /// Run the connect/subscribe/deliver loop until the pipeline side of
    /// the channel closes. Connection loss is recoverable: the loop
    /// rebuilds the client after the reconnect interval and resubscribes
    /// on every broker acknowledgment.
    pub async fn run(self) {
        let subscriptions = self.settings.effective_subscriptions();
        let reconnect = Duration::from_secs(self.settings.reconnect_interval_secs);

        loop {
            let client_id = format!(
                "{}-{}",
                self.settings.client_id_prefix,
                Utc::now().timestamp()
            );
            let mut options = MqttOptions::new(
                client_id,
                self.settings.host.as_str(),
                self.settings.port,
            );
            options.set_keep_alive(Duration::from_secs(self.settings.keepalive_secs));
            if !self.settings.username.is_empty() {
                options.set_credentials(
                    self.settings.username.as_str(),
                    self.settings.password.as_str(),
                );
            }

            let (client, mut eventloop) = AsyncClient::new(options, 64);

            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!(
                            host = %self.settings.host,
                            port = self.settings.port,
                            "connected to MQTT broker"
                        );
                        for sub in &subscriptions {
                            match client.subscribe(sub.topic.as_str(), to_qos(sub.qos)).await {
                                Ok(()) => info!(topic = %sub.topic, qos = sub.qos, "subscribed"),
                                Err(e) => error!(topic = %sub.topic, error = %e, "subscribe failed"),
                            }
                        }
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        if !self.deliver(&publish).await {
                            info!("pipeline closed, stopping ingest");
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            error = %e,
                            retry_secs = reconnect.as_secs(),
                            "MQTT connection error, reconnecting"
                        );
                        tokio::time::sleep(reconnect).await;
                        break;
                    }
                }
            }
        }
    }

    /// Decode one publish and hand it to the pipeline. Returns false when
    /// the pipeline receiver is gone.
    async fn deliver(&self, publish: &Publish) -> bool {
        let topic = publish.topic.as_str();
        let Some((entity_id, channel)) = parse_topic(topic, &self.settings.topic_root) else {
            debug!(topic, "ignoring message on unrecognized topic");
            return true;
        };
        let msg = decode_payload(channel, entity_id, topic, &publish.payload, Utc::now());
        self.tx.send(msg).await.is_ok()
    }
}

fn to_qos(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_subscriptions_cover_all_channels() {
        let settings = MqttSettings::default();
        let subs = settings.effective_subscriptions();
        let topics: Vec<_> = subs.iter().map(|s| s.topic.as_str()).collect();
        assert_eq!(subs.len(), 5);
        assert!(topics.contains(&"hbot/+/log"));
        assert!(topics.contains(&"hbot/+/status_updates"));
        assert!(topics.contains(&"hbot/+/hb"));
        assert!(subs.iter().all(|s| s.qos == 1));
    }

    #[test]
    fn test_explicit_subscriptions_win() {
        let settings = MqttSettings {
            subscriptions: vec![Subscription {
                topic: "hbot/bot-1/log".to_string(),
                qos: 2,
            }],
            ..Default::default()
        };
        let subs = settings.effective_subscriptions();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].topic, "hbot/bot-1/log");
    }

    #[test]
    fn test_qos_mapping() {
        assert_eq!(to_qos(0), QoS::AtMostOnce);
        assert_eq!(to_qos(1), QoS::AtLeastOnce);
        assert_eq!(to_qos(2), QoS::ExactlyOnce);
        assert_eq!(to_qos(7), QoS::AtLeastOnce);
    }
}
