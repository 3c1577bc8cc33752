//! Telegram delivery channel for quotebot.
//!
//! Outbound-only: text messages and photo-with-caption posts, plus a
//! best-effort chat-id discovery from the most recent inbound update. No
//! long-polling loop — this bot never listens for messages.

pub mod api;
pub mod types;

use async_trait::async_trait;
use tracing::debug;

use quotebot_core::DeliveryChannel;
use quotebot_types::TaskError;

use api::TelegramApi;
use types::{SendMessageParams, Update};

/// Stateless Telegram channel; credentials are supplied per call.
#[derive(Default)]
pub struct TelegramChannel;

impl TelegramChannel {
    pub fn new() -> Self {
        Self
    }

    fn check_credentials(token: &str, chat_id: &str) -> Result<(), TaskError> {
        if token.is_empty() {
            return Err(TaskError::MissingCredential("Telegram bot token"));
        }
        if chat_id.is_empty() {
            return Err(TaskError::MissingCredential("chat ID"));
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    async fn send_text(&self, token: &str, chat_id: &str, text: &str) -> Result<(), TaskError> {
        Self::check_credentials(token, chat_id)?;
        let api = TelegramApi::new(token);

        // Try Markdown first, fall back to plain text when the quote
        // contains characters Telegram refuses to parse.
        let result = api
            .send_message(&SendMessageParams {
                chat_id: chat_id.to_string(),
                text: text.to_string(),
                parse_mode: Some("Markdown".into()),
            })
            .await;

        if let Err(e) = result {
            debug!("Markdown send failed ({e}), retrying as plain text");
            api.send_message(&SendMessageParams {
                chat_id: chat_id.to_string(),
                text: text.to_string(),
                parse_mode: None,
            })
            .await?;
        }
        Ok(())
    }

    async fn send_photo(
        &self,
        token: &str,
        chat_id: &str,
        image: &[u8],
        caption: &str,
    ) -> Result<(), TaskError> {
        Self::check_credentials(token, chat_id)?;
        TelegramApi::new(token)
            .send_photo(chat_id, image, caption)
            .await
    }
}

/// Chat id of the most recent inbound message or channel post, or None when
/// the bot has seen no traffic yet.
pub async fn discover_chat_id(token: &str) -> Result<Option<i64>, TaskError> {
    if token.is_empty() {
        return Err(TaskError::MissingCredential("Telegram bot token"));
    }
    let updates = TelegramApi::new(token).get_updates().await?;
    Ok(chat_id_from_updates(&updates))
}

fn chat_id_from_updates(updates: &[Update]) -> Option<i64> {
    let last = updates.last()?;
    last.message
        .as_ref()
        .or(last.channel_post.as_ref())
        .map(|m| m.chat.id)
}
