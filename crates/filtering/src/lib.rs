//! Admission Filtering
//!
//! Decides whether a raw message is even eligible for classification.
//! Rules are applied in a fixed order and short-circuit on the first
//! rejection:
//!
//! 1. entity allow-list
//! 2. severity allow-list (log channel)
//! 3. pattern allow-list (log channel only; status is never pattern-gated)
//! 4. keyword allow/deny lists (notify/events channels; deny wins)
//!
//! All patterns are compiled once at startup; an invalid pattern or
//! severity name is a fatal configuration error.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use events::{Channel, RawMessage, Severity};

/// Filter configuration error types
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("invalid log pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("unknown severity {0:?} in severity allow-list")]
    UnknownSeverity(String),
}

/// Raw filter settings as they appear in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSettings {
    /// Entity allow-list; empty means all entities are admitted.
    #[serde(default)]
    pub entity_ids: Vec<String>,
    /// Severity allow-list for log messages (names like "ERROR").
    #[serde(default)]
    pub severities: Vec<String>,
    /// Case-insensitive regex a log payload must match; absent admits all.
    #[serde(default)]
    pub log_pattern: Option<String>,
    /// Keywords a notify/events payload must contain at least one of.
    #[serde(default)]
    pub alert_keywords: Vec<String>,
    /// Keywords that reject a notify/events payload outright.
    #[serde(default)]
    pub ignore_keywords: Vec<String>,
    /// Deduplication window in seconds (consumed by the pipeline's
    /// dedup store, kept here because it is part of the filter surface).
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,
}

fn default_dedup_window_secs() -> u64 {
    300
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            entity_ids: Vec::new(),
            severities: Vec::new(),
            log_pattern: None,
            alert_keywords: Vec::new(),
            ignore_keywords: Vec::new(),
            dedup_window_secs: default_dedup_window_secs(),
        }
    }
}

/// Compiled admission rules. Pure predicate over configuration and
/// message content; holds no mutable state.
#[derive(Debug)]
pub struct FilterPipeline {
    entity_ids: HashSet<String>,
    severities: HashSet<Severity>,
    log_pattern: Option<Regex>,
    alert_keywords: Vec<String>,
    ignore_keywords: Vec<String>,
}

impl FilterPipeline {
    /// Compile filter settings, failing fast on invalid patterns or
    /// severity names.
    pub fn new(settings: &FilterSettings) -> Result<Self, FilterError> {
        let log_pattern = match settings.log_pattern.as_deref() {
            Some(pattern) if !pattern.is_empty() => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| FilterError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    })?,
            ),
            _ => None,
        };

        let mut severities = HashSet::new();
        for name in &settings.severities {
            let severity = name
                .parse::<Severity>()
                .map_err(|_| FilterError::UnknownSeverity(name.clone()))?;
            severities.insert(severity);
        }

        Ok(Self {
            entity_ids: settings.entity_ids.iter().cloned().collect(),
            severities,
            log_pattern,
            alert_keywords: lowercase_all(&settings.alert_keywords),
            ignore_keywords: lowercase_all(&settings.ignore_keywords),
        })
    }

    /// Admit or reject a raw message. No side effects.
    pub fn admit(&self, msg: &RawMessage) -> bool {
        // Rule 1: entity allow-list
        if !self.entity_ids.is_empty() && !self.entity_ids.contains(&msg.entity_id) {
            debug!(entity = %msg.entity_id, "rejected: entity not in allow-list");
            return false;
        }

        // Rule 2: severity allow-list (log channel, declared severity only)
        if msg.channel == Channel::Log {
            if let Some(severity) = msg.declared_severity {
                if !self.severities.is_empty() && !self.severities.contains(&severity) {
                    debug!(entity = %msg.entity_id, %severity, "rejected: severity not allowed");
                    return false;
                }
            }
        }

        // Rule 3: pattern allow-list. Log channel only; status transitions
        // must never be silently dropped by content filtering.
        if msg.channel == Channel::Log {
            if let Some(pattern) = &self.log_pattern {
                if !pattern.is_match(&msg.payload) {
                    debug!(entity = %msg.entity_id, "rejected: log pattern did not match");
                    return false;
                }
            }
        }

        // Rule 4: keyword gate for notify/events channels, deny wins.
        if matches!(msg.channel, Channel::Notify | Channel::Event) {
            let payload = msg.payload.to_lowercase();
            if self.ignore_keywords.iter().any(|kw| payload.contains(kw)) {
                debug!(entity = %msg.entity_id, "rejected: ignore keyword present");
                return false;
            }
            if !self.alert_keywords.is_empty()
                && !self.alert_keywords.iter().any(|kw| payload.contains(kw))
            {
                debug!(entity = %msg.entity_id, "rejected: no alert keyword present");
                return false;
            }
        }

        true
    }
}

fn lowercase_all(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .filter(|kw| !kw.is_empty())
        .map(|kw| kw.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(channel: Channel, entity: &str, payload: &str) -> RawMessage {
        RawMessage {
            channel,
            entity_id: entity.to_string(),
            payload: payload.to_string(),
            declared_severity: None,
            source_topic: format!("hbot/{}/{}", entity, channel.topic_segment()),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_settings_admit_everything() {
        let filters = FilterPipeline::new(&FilterSettings::default()).unwrap();
        assert!(filters.admit(&msg(Channel::Log, "bot-1", "anything at all")));
        assert!(filters.admit(&msg(Channel::Notify, "bot-1", "anything at all")));
    }

    #[test]
    fn test_entity_allow_list() {
        let settings = FilterSettings {
            entity_ids: vec!["bot-1".to_string()],
            ..Default::default()
        };
        let filters = FilterPipeline::new(&settings).unwrap();
        assert!(filters.admit(&msg(Channel::Log, "bot-1", "hello")));
        assert!(!filters.admit(&msg(Channel::Log, "bot-2", "hello")));
    }

    #[test]
    fn test_severity_allow_list_only_gates_declared_log_levels() {
        let settings = FilterSettings {
            severities: vec!["ERROR".to_string(), "WARNING".to_string()],
            ..Default::default()
        };
        let filters = FilterPipeline::new(&settings).unwrap();

        let mut message = msg(Channel::Log, "bot-1", "something happened");
        message.declared_severity = Some(Severity::Info);
        assert!(!filters.admit(&message));

        message.declared_severity = Some(Severity::Error);
        assert!(filters.admit(&message));

        // No declared severity: rule does not apply.
        message.declared_severity = None;
        assert!(filters.admit(&message));
    }

    #[test]
    fn test_log_pattern_gates_log_channel_only() {
        let settings = FilterSettings {
            log_pattern: Some("drawdown|stopped".to_string()),
            ..Default::default()
        };
        let filters = FilterPipeline::new(&settings).unwrap();

        assert!(filters.admit(&msg(Channel::Log, "bot-1", "Max DRAWDOWN reached")));
        assert!(!filters.admit(&msg(Channel::Log, "bot-1", "order book refreshed")));

        // Status payloads bypass the pattern entirely.
        assert!(filters.admit(&msg(Channel::Status, "bot-1", "running")));
    }

    #[test]
    fn test_keyword_gate_deny_wins() {
        let settings = FilterSettings {
            alert_keywords: vec!["failed".to_string()],
            ignore_keywords: vec!["heartbeat".to_string()],
            ..Default::default()
        };
        let filters = FilterPipeline::new(&settings).unwrap();

        assert!(filters.admit(&msg(Channel::Notify, "bot-1", "Order FAILED to place")));
        assert!(!filters.admit(&msg(Channel::Notify, "bot-1", "routine update")));
        // Deny keyword rejects even when an allow keyword is present.
        assert!(!filters.admit(&msg(
            Channel::Notify,
            "bot-1",
            "heartbeat check failed"
        )));
        // Keyword gate does not apply to the log channel.
        assert!(filters.admit(&msg(Channel::Log, "bot-1", "routine update")));
    }

    #[test]
    fn test_invalid_pattern_is_fatal() {
        let settings = FilterSettings {
            log_pattern: Some("(unclosed".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            FilterPipeline::new(&settings),
            Err(FilterError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_unknown_severity_is_fatal() {
        let settings = FilterSettings {
            severities: vec!["LOUD".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            FilterPipeline::new(&settings),
            Err(FilterError::UnknownSeverity(_))
        ));
    }
}
