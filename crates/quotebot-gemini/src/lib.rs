//! Gemini content provider: quote text and illustration generation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use quotebot_core::ContentProvider;
use quotebot_types::TaskError;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Text generation model.
pub const TEXT_MODEL: &str = "gemini-2.5-flash";
/// Image generation model.
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const QUOTE_PROMPT: &str = "\
Write exactly ONE quote from a book or ONE famous saying, drawn from world \
classics, modern literature, poetry or philosophy, on a randomly chosen topic.

Do NOT keep picking quotes about 'people' or 'life'. Keep the range of topics \
wide: nature, love, time, melancholy, art, science, courage, fear, hope, the \
past, the future, friendship, solitude — pick completely at random among such \
themes. Variety matters; do not reuse the same words.

The format must be exactly (with a blank line between the quote and the \
source):

\"Quote sentence\"

\u{1F4D6} Book Title, Author

Example output:
\"All happy families are alike; each unhappy family is unhappy in its own way.\"

\u{1F4D6} Anna Karenina, Leo Tolstoy

No explanations, no preamble, no numbering — return a single quote in the \
format above.";

/// HTTP client for the Gemini generateContent endpoints.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    async fn generate(&self, model: &str, api_key: &str, body: &Value) -> Result<Value, TaskError> {
        let url = format!("{}/models/{model}:generateContent?key={api_key}", self.base_url);

        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TaskError::NetworkOrCors {
                detail: e.to_string(),
            })?;

        let status = resp.status().as_u16();
        let json: Value = resp.json().await.map_err(|e| TaskError::NetworkOrCors {
            detail: e.to_string(),
        })?;

        if !(200..300).contains(&status) {
            let message = json
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            debug!(status, "Gemini API error: {message}");
            return Err(classify_api_error(status, message));
        }
        Ok(json)
    }
}

#[async_trait]
impl ContentProvider for GeminiClient {
    async fn generate_text(&self, api_key: &str) -> Result<String, TaskError> {
        if api_key.is_empty() {
            return Err(TaskError::MissingCredential("Gemini API key"));
        }

        let body = json!({
            "contents": [{ "parts": [{ "text": QUOTE_PROMPT }] }],
            "generationConfig": {
                // High temperature for variety across runs
                "temperature": 1.2,
                "maxOutputTokens": 1000,
                "thinkingConfig": { "thinkingBudget": 0 },
            },
            "safetySettings": permissive_safety_settings(),
        });

        let json = self.generate(TEXT_MODEL, api_key, &body).await?;
        extract_text(&json)
    }

    async fn generate_image(&self, api_key: &str, text: &str) -> Result<Vec<u8>, TaskError> {
        if api_key.is_empty() {
            return Err(TaskError::MissingCredential("Gemini API key"));
        }

        // Random seed in the prompt avoids cached identical renders
        let seed = chrono::Utc::now().timestamp_millis() % 1_000_000;
        let prompt = format!(
            "Create an artistic, atmospheric, and high-quality illustration that \
             visually represents the mood and meaning of the following quote. \
             No text in the image. Style: Oil painting, Vintage, Textured, \
             Classic Art. Quote: {text}. Seed: {seed}"
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "text/plain" },
            "safetySettings": permissive_safety_settings(),
        });

        let json = self.generate(IMAGE_MODEL, api_key, &body).await?;
        extract_image_bytes(&json)
    }
}

fn permissive_safety_settings() -> Value {
    json!([
        { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE" },
        { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE" },
        { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" },
        { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE" }
    ])
}

/// Map a Gemini API error onto the failure taxonomy.
fn classify_api_error(status: u16, message: &str) -> TaskError {
    let quota = status == 429
        || message.contains("429")
        || message.contains("quota")
        || message.contains("RESOURCE_EXHAUSTED");
    if quota {
        if message.contains("limit: 0") {
            return TaskError::QuotaExceededPermanent {
                detail: message.to_string(),
            };
        }
        return TaskError::QuotaExceeded {
            detail: message.to_string(),
        };
    }

    if status == 403
        || message.contains("API key not valid")
        || message.contains("PERMISSION_DENIED")
    {
        return TaskError::AuthInvalid {
            detail: message.to_string(),
        };
    }

    TaskError::Other(message.to_string())
}

/// Concatenated text parts of the first candidate.
fn extract_text(body: &Value) -> Result<String, TaskError> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or(TaskError::EmptyResponse)?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    let text = text.trim();
    if text.is_empty() {
        return Err(TaskError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Decoded bytes of the first inline-data part of the first candidate.
fn extract_image_bytes(body: &Value) -> Result<Vec<u8>, TaskError> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or(TaskError::NoImageInResponse)?;

    let data = parts
        .iter()
        .filter_map(|p| p.pointer("/inlineData/data").and_then(Value::as_str))
        .next()
        .ok_or(TaskError::NoImageInResponse)?;

    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, data)
        .map_err(|e| TaskError::Other(format!("invalid image payload: {e}")))
}
