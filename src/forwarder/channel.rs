//! Channel client contract used by the forward loop.

use std::fmt;
use std::future::Future;

use teloxide::types::{ChatId, Recipient};

/// A failed fetch or send for a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The source message could not be read.
    Fetch(String),
    /// The source message exists but carries no text or caption.
    NoText,
    /// The target rejected the copy.
    Send(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch failed: {e}"),
            Self::NoText => write!(f, "message has no text"),
            Self::Send(e) => write!(f, "send failed: {e}"),
        }
    }
}

impl std::error::Error for TransferError {}

/// Reads messages from one channel and writes text into another.
pub trait ChannelClient: Send + Sync {
    fn fetch_message(&self, channel: &str, message_id: i32) -> impl Future<Output = Result<String, TransferError>> + Send;

    fn send_text(&self, channel: &str, text: &str) -> impl Future<Output = Result<(), TransferError>> + Send;
}

/// Turn a user-supplied channel identifier into a Telegram recipient.
///
/// Signed integers are chat IDs (`-1001234567890`); anything else is a public
/// username, with the leading `@` added when missing.
pub fn recipient(channel: &str) -> Recipient {
    let channel = channel.trim();
    match channel.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if channel.starts_with('@') => Recipient::ChannelUsername(channel.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{channel}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ids() {
        assert_eq!(recipient("-1001234567890"), Recipient::Id(ChatId(-1001234567890)));
        assert_eq!(recipient(" 42 "), Recipient::Id(ChatId(42)));
    }

    #[test]
    fn test_usernames() {
        assert_eq!(recipient("@news"), Recipient::ChannelUsername("@news".into()));
        assert_eq!(recipient("news"), Recipient::ChannelUsername("@news".into()));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(TransferError::NoText.to_string(), "message has no text");
        assert_eq!(TransferError::Send("chat not found".into()).to_string(), "send failed: chat not found");
    }
}
