//! Channel client using teloxide.

use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{debug, warn};

use crate::forwarder::channel::recipient;
use crate::forwarder::{ChannelClient, TransferError};

/// Copies messages through the Bot API.
///
/// The Bot API cannot read a message by ID, so fetching forwards it into a
/// staging chat, takes its text and deletes the staged copy.
pub struct TelegramChannel {
    bot: Bot,
    staging_chat: ChatId,
}

impl TelegramChannel {
    pub fn new(bot: Bot, staging_chat: ChatId) -> Self {
        Self { bot, staging_chat }
    }
}

impl ChannelClient for TelegramChannel {
    async fn fetch_message(&self, channel: &str, message_id: i32) -> Result<String, TransferError> {
        let staged = self
            .bot
            .forward_message(self.staging_chat, recipient(channel), MessageId(message_id))
            .disable_notification(true)
            .await
            .map_err(|e| TransferError::Fetch(e.to_string()))?;

        let text = staged.text().or_else(|| staged.caption()).map(str::to_string);

        if let Err(e) = self.bot.delete_message(self.staging_chat, staged.id).await {
            warn!("Failed to delete staged copy of message {message_id}: {e}");
        }

        debug!("Fetched message {message_id} from {channel}");
        text.ok_or(TransferError::NoText)
    }

    async fn send_text(&self, channel: &str, text: &str) -> Result<(), TransferError> {
        self.bot
            .send_message(recipient(channel), text)
            .await
            .map(|_| ())
            .map_err(|e| TransferError::Send(e.to_string()))
    }
}
