//! Bounded quota retry around a content provider.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use quotebot_types::TaskError;

use crate::provider::ContentProvider;

/// Back-off before the single image-generation retry.
pub const QUOTA_RETRY_BACKOFF: Duration = Duration::from_secs(15);

/// Wraps a provider so that image generation retries exactly once after a
/// fixed back-off when the failure is a transient quota error. Permanent
/// zero-quota restrictions are never retried, and text generation is never
/// retried.
pub struct QuotaRetry<P> {
    inner: P,
}

impl<P: ContentProvider> QuotaRetry<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: ContentProvider> ContentProvider for QuotaRetry<P> {
    async fn generate_text(&self, api_key: &str) -> Result<String, TaskError> {
        self.inner.generate_text(api_key).await
    }

    async fn generate_image(&self, api_key: &str, text: &str) -> Result<Vec<u8>, TaskError> {
        match self.inner.generate_image(api_key, text).await {
            Err(e) if e.is_retryable_quota() => {
                warn!(
                    backoff_secs = QUOTA_RETRY_BACKOFF.as_secs(),
                    "Quota exceeded, retrying image generation once: {e}"
                );
                tokio::time::sleep(QUOTA_RETRY_BACKOFF).await;
                self.inner.generate_image(api_key, text).await
            }
            other => other,
        }
    }
}
