//! Telegram Bot API HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use quotebot_types::TaskError;

use crate::types::{ApiResponse, BotInfo, SendMessageParams, TgMessage, Update};

/// HTTP client for the Telegram Bot API, bound to one bot token.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    /// Create a new API client with the given bot token.
    pub fn new(bot_token: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        }
    }

    fn network_err(e: reqwest::Error) -> TaskError {
        TaskError::NetworkOrCors {
            detail: e.to_string(),
        }
    }

    fn rejected<T>(resp: ApiResponse<T>) -> TaskError {
        TaskError::RemoteRejected {
            description: resp
                .description
                .unwrap_or_else(|| "unknown Telegram API error".into()),
        }
    }

    /// Verify the bot token by calling `getMe`.
    pub async fn get_me(&self) -> Result<BotInfo, TaskError> {
        let resp: ApiResponse<BotInfo> = self
            .client
            .get(format!("{}/getMe", self.base_url))
            .send()
            .await
            .map_err(Self::network_err)?
            .json()
            .await
            .map_err(Self::network_err)?;

        if !resp.ok {
            return Err(Self::rejected(resp));
        }
        resp.result.ok_or(TaskError::RemoteRejected {
            description: "getMe returned no result".into(),
        })
    }

    /// Fetch pending updates (used for destination discovery only).
    pub async fn get_updates(&self) -> Result<Vec<Update>, TaskError> {
        let resp: ApiResponse<Vec<Update>> = self
            .client
            .get(format!("{}/getUpdates", self.base_url))
            .send()
            .await
            .map_err(Self::network_err)?
            .json()
            .await
            .map_err(Self::network_err)?;

        if !resp.ok {
            return Err(Self::rejected(resp));
        }
        Ok(resp.result.unwrap_or_default())
    }

    /// Send a text message.
    pub async fn send_message(&self, params: &SendMessageParams) -> Result<TgMessage, TaskError> {
        let resp: ApiResponse<TgMessage> = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(params)
            .send()
            .await
            .map_err(Self::network_err)?
            .json()
            .await
            .map_err(Self::network_err)?;

        if !resp.ok {
            return Err(Self::rejected(resp));
        }
        resp.result.ok_or(TaskError::RemoteRejected {
            description: "sendMessage returned no result".into(),
        })
    }

    /// Send a photo with a caption as a multipart upload.
    pub async fn send_photo(
        &self,
        chat_id: &str,
        image: &[u8],
        caption: &str,
    ) -> Result<(), TaskError> {
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("quote_image.png")
            .mime_str("image/png")
            .map_err(|e| TaskError::Other(format!("invalid photo part: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", part);

        let resp: ApiResponse<Value> = self
            .client
            .post(format!("{}/sendPhoto", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(Self::network_err)?
            .json()
            .await
            .map_err(Self::network_err)?;

        if !resp.ok {
            return Err(Self::rejected(resp));
        }
        Ok(())
    }
}
