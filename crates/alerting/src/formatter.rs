//! Alert text rendering

use std::collections::HashMap;

use events::{Event, EventKind, Severity};

/// Glyphs that mark a message body as already formatted; such bodies are
/// passed through verbatim with only source/time lines appended.
const RECOGNIZED_GLYPHS: &[&str] = &[
    "🛑", "✅", "⚠️", "💥", "🔴", "🟡", "ℹ️", "📝", "📊", "⚡", "🔔", "💔",
];

/// Escape the characters that break Telegram Markdown (v1) so free text
/// renders literally.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '_' | '*' | '[' | ']' | '(' | ')' | '`' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Renders events into the final alert text.
#[derive(Debug, Clone)]
pub struct AlertFormatter {
    use_markdown: bool,
    /// Prefix → replacement rewrites applied to the source label.
    source_aliases: HashMap<String, String>,
}

impl AlertFormatter {
    pub fn new(use_markdown: bool, source_aliases: HashMap<String, String>) -> Self {
        Self {
            use_markdown,
            source_aliases,
        }
    }

    /// Build the final alert text for an event.
    pub fn render(&self, event: &Event) -> String {
        let time_str = event.occurred_at.format("%Y-%m-%d %H:%M:%S").to_string();
        let source = self.alias_source(&event.source);

        if is_preformatted(&event.detail) {
            return self.render_passthrough(&event.detail, &source, &time_str);
        }

        let glyph = severity_glyph(event.severity);
        let title = self.title_for(event);

        if self.use_markdown {
            let mut lines = vec![
                format!("{} *{}*", glyph, escape_markdown(title)),
                String::new(),
                format!("*Agent:* `{}`", escape_markdown(&event.entity_id)),
            ];
            if let EventKind::ScopedThresholdBreach { scope_id } = &event.kind {
                lines.push(format!("*Controller:* `{}`", escape_markdown(scope_id)));
            }
            lines.push(format!("*Level:* {}", event.severity));
            lines.push(format!("*Source:* `{}`", escape_markdown(&source)));
            lines.push(format!("*Time:* {}", time_str));
            lines.push(String::new());
            lines.push("*Message:*".to_string());
            lines.push(escape_markdown(&event.detail));
            lines.join("\n")
        } else {
            let mut lines = vec![
                format!("{} {}", glyph, title),
                format!("Agent: {}", event.entity_id),
            ];
            if let EventKind::ScopedThresholdBreach { scope_id } = &event.kind {
                lines.push(format!("Controller: {}", scope_id));
            }
            lines.push(format!("Level: {}", event.severity));
            lines.push(format!("Source: {}", source));
            lines.push(format!("Time: {}", time_str));
            lines.push(format!("\nMessage:\n{}", event.detail));
            lines.join("\n")
        }
    }

    /// Pre-formatted bodies keep their text verbatim; only missing
    /// source/time lines are appended.
    fn render_passthrough(&self, body: &str, source: &str, time_str: &str) -> String {
        let mut extras = Vec::new();
        if !body.contains("Source:") {
            if self.use_markdown {
                extras.push(format!("*Source:* `{}`", escape_markdown(source)));
            } else {
                extras.push(format!("Source: {}", source));
            }
        }
        if !body.contains(time_str) {
            if self.use_markdown {
                extras.push(format!("*Time:* {}", time_str));
            } else {
                extras.push(format!("Time: {}", time_str));
            }
        }
        if extras.is_empty() {
            body.to_string()
        } else {
            format!("{}\n\n{}", body, extras.join("\n"))
        }
    }

    fn title_for(&self, event: &Event) -> &'static str {
        match &event.kind {
            EventKind::GlobalThresholdBreach => "Global Drawdown Reached",
            EventKind::ScopedThresholdBreach { .. } => "Controller Drawdown",
            EventKind::LifecycleStarted => "Agent Started",
            EventKind::LifecycleStopped => "Agent Stopped",
            EventKind::LivenessTimeout => "Heartbeat Timeout",
            EventKind::GenericError => match event.severity {
                Severity::Error => "Critical Alert",
                Severity::Warning => "Warning",
                Severity::Info => "Information",
            },
        }
    }

    /// Rewrite the source label through the configured prefix table
    /// (e.g. display an internal topic namespace under a public name).
    fn alias_source(&self, source: &str) -> String {
        let mut aliased = source.to_string();
        for (original, replacement) in &self.source_aliases {
            if !original.is_empty() && aliased.starts_with(original.as_str()) {
                aliased = format!("{}{}", replacement, &aliased[original.len()..]);
            }
        }
        aliased
    }
}

fn severity_glyph(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "🔴",
        Severity::Warning => "🟡",
        Severity::Info => "ℹ️",
    }
}

fn is_preformatted(body: &str) -> bool {
    let trimmed = body.trim_start();
    RECOGNIZED_GLYPHS
        .iter()
        .any(|glyph| trimmed.starts_with(glyph))
}
