use chrono::{DateTime, Utc};

use crate::core::models::RawMessage;
use crate::prompt::SUMMARY_MARKER;

/// True for summaries this tool posted on an earlier run.
#[must_use]
pub fn is_own_summary(text: &str) -> bool {
    text.contains(SUMMARY_MARKER)
}

/// Trimmed text of a message worth summarizing.
///
/// Returns `None` for undated messages, messages before `cutoff`, messages
/// with blank text, and this tool's own summaries.
#[must_use]
pub fn summarizable_text(message: &RawMessage, cutoff: DateTime<Utc>) -> Option<&str> {
    let date = message.date?;
    if date < cutoff {
        return None;
    }
    let text = message.text.trim();
    if text.is_empty() || is_own_summary(text) {
        return None;
    }
    Some(text)
}
