//! Collaborator seams for content generation and message delivery.

use async_trait::async_trait;

use quotebot_types::TaskError;

/// Produces quote text and illustration bytes from an external model API.
///
/// Credentials are passed per call; implementations hold no operator state.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Generate a single quote.
    async fn generate_text(&self, api_key: &str) -> Result<String, TaskError>;

    /// Generate an illustration for the given quote. Returns raw image bytes.
    async fn generate_image(&self, api_key: &str, text: &str) -> Result<Vec<u8>, TaskError>;
}

/// Delivers content to an addressable destination chat.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Post a text message.
    async fn send_text(&self, token: &str, chat_id: &str, text: &str) -> Result<(), TaskError>;

    /// Post a photo with a caption.
    async fn send_photo(
        &self,
        token: &str,
        chat_id: &str,
        image: &[u8],
        caption: &str,
    ) -> Result<(), TaskError>;
}
