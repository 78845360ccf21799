use async_trait::async_trait;

use crate::core::models::{Destination, MessagePage, TopicCursor, TopicPage};
use crate::errors::DigestError;

/// RPC error names meaning this account may not post in the chat.
pub const WRITE_FORBIDDEN_ERRORS: &[&str] = &[
    "CHAT_WRITE_FORBIDDEN",
    "USER_BANNED_IN_CHANNEL",
    "CHAT_SEND_PLAIN_FORBIDDEN",
    "CHAT_RESTRICTED",
    "CHAT_ADMIN_REQUIRED",
    "TOPIC_CLOSED",
];

/// The paged operations the digest needs from the chat platform.
///
/// Implementations own authentication, flood waits and the wire format; the
/// digest owns cutoff, de-duplication and reassembly on top.
#[async_trait]
pub trait ForumGateway: Send + Sync {
    /// List forum topics of the target group, starting after `cursor`.
    async fn list_topics(&self, cursor: TopicCursor, limit: usize)
    -> Result<TopicPage, DigestError>;

    /// Search messages scoped to `top_msg_id`, newest first, older than `offset_id`
    /// (`0` starts at the newest message).
    async fn search_messages(
        &self,
        top_msg_id: i32,
        offset_id: i32,
        limit: usize,
    ) -> Result<MessagePage, DigestError>;

    /// # Errors
    ///
    /// Returns `WriteForbidden` when the platform refuses the post on permission grounds.
    async fn send_message(&self, destination: Destination, text: &str) -> Result<(), DigestError>;
}

/// Map a send failure onto `WriteForbidden` or a generic Telegram error.
#[must_use]
pub fn classify_send_error(message: &str) -> DigestError {
    match WRITE_FORBIDDEN_ERRORS
        .iter()
        .find(|name| message.contains(*name))
    {
        Some(name) => DigestError::WriteForbidden((*name).to_string()),
        None => DigestError::TelegramError(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_send_error_detects_permission_failures() {
        let err = classify_send_error("rpc error 403: CHAT_WRITE_FORBIDDEN caused by messages.sendMessage");
        assert!(err.is_write_forbidden());
        assert_eq!(err.to_string(), "Telegram rejected the write: CHAT_WRITE_FORBIDDEN");

        let banned = classify_send_error("rpc error 400: USER_BANNED_IN_CHANNEL");
        assert!(banned.is_write_forbidden());
    }

    #[test]
    fn test_classify_send_error_keeps_other_failures_generic() {
        let err = classify_send_error("rpc error 420: FLOOD_WAIT (value: 30)");
        assert!(!err.is_write_forbidden());
        assert!(err.to_string().contains("FLOOD_WAIT"));
    }
}
