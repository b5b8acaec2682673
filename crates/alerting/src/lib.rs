//! Alerting
//!
//! Renders classified events into final alert text and delivers them to
//! the downstream notification channel. Delivery is best-effort: a
//! failed push is logged and dropped, never retried indefinitely.

mod dispatcher;
mod formatter;
mod notifier;

pub use dispatcher::{run_dispatcher, OutboundAlert};
pub use formatter::{escape_markdown, AlertFormatter};
pub use notifier::{Notifier, NotifyError, TelegramNotifier, TelegramSettings};
