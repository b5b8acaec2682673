//! Outbound notification channel (Telegram push API)

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

/// Notification delivery error types
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notifier misconfigured: {0}")]
    Misconfigured(&'static str),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Telegram section of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_use_markdown")]
    pub use_markdown: bool,
    /// Prefix rewrites applied to the displayed source label.
    #[serde(default)]
    pub source_aliases: HashMap<String, String>,
}

fn default_use_markdown() -> bool {
    true
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            use_markdown: true,
            source_aliases: HashMap::new(),
        }
    }
}

/// Delivery seam between the pipeline and the outside world; lets tests
/// capture alerts without a network.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Sends alerts through the Telegram `sendMessage` push API.
pub struct TelegramNotifier {
    client: Client,
    settings: TelegramSettings,
}

impl TelegramNotifier {
    /// Build the notifier. An enabled notifier without a token or chat id
    /// is a fatal configuration error.
    pub fn new(settings: TelegramSettings) -> Result<Self, NotifyError> {
        if settings.enabled {
            if settings.bot_token.is_empty() {
                return Err(NotifyError::Misconfigured("telegram.bot_token is empty"));
            }
            if settings.chat_id.is_empty() {
                return Err(NotifyError::Misconfigured("telegram.chat_id is empty"));
            }
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if !self.settings.enabled {
            debug!("telegram disabled, alert not sent");
            return Ok(());
        }

        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.settings.bot_token
        );
        let mut body = json!({
            "chat_id": self.settings.chat_id,
            "text": text,
        });
        if self.settings.use_markdown {
            body["parse_mode"] = json!("Markdown");
        }

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            info!("telegram alert sent");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_notifier_requires_credentials() {
        let settings = TelegramSettings {
            enabled: true,
            ..Default::default()
        };
        assert!(matches!(
            TelegramNotifier::new(settings),
            Err(NotifyError::Misconfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_a_noop() {
        let notifier = TelegramNotifier::new(TelegramSettings::default()).unwrap();
        assert!(notifier.send("hello").await.is_ok());
    }
}
