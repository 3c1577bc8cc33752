//! End-to-end task execution: generate content, deliver it, keep the shared
//! status honest around every outcome.

use std::sync::{Arc, RwLock};

use quotebot_types::{ContentType, ExecutionStatus, TaskError, TriggerSource};

use crate::interval::IntervalScheduler;
use crate::log::LogStream;
use crate::provider::{ContentProvider, DeliveryChannel};
use crate::status::StatusCell;

/// Operator-supplied credentials, held in memory only.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub gemini_api_key: String,
    pub bot_token: String,
    pub chat_id: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.gemini_api_key.is_empty() && !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

/// Runs one generate-and-deliver cycle.
///
/// Failures from either collaborator are caught here, classified, logged,
/// and swallowed; the shared status always ends at Idle or Running.
pub struct TaskExecutor {
    provider: Arc<dyn ContentProvider>,
    channel: Arc<dyn DeliveryChannel>,
    status: Arc<StatusCell>,
    log: Arc<LogStream>,
    interval: Arc<IntervalScheduler>,
    credentials: RwLock<Credentials>,
}

impl TaskExecutor {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        channel: Arc<dyn DeliveryChannel>,
        status: Arc<StatusCell>,
        log: Arc<LogStream>,
        interval: Arc<IntervalScheduler>,
        credentials: Credentials,
    ) -> Self {
        Self {
            provider,
            channel,
            status,
            log,
            interval,
            credentials: RwLock::new(credentials),
        }
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials.read().unwrap().clone()
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write().unwrap() = credentials;
    }

    /// Execute one cycle for the given content type. Never returns an error;
    /// the shared status is settled on every path, including the busy claim
    /// the triggering scheduler took before calling in.
    pub async fn execute(&self, content_type: ContentType, source: TriggerSource) {
        let creds = self.credentials();
        if !creds.is_complete() {
            self.log.error(
                "Bot token, chat ID and Gemini API key are required.",
                None,
            );
            self.status.settle();
            return;
        }

        self.status.set(ExecutionStatus::FetchingContent);

        if let Err(e) = self.run_cycle(content_type, source, &creds).await {
            self.log.error(
                format!("Task failed ({}): {e}", content_type.label()),
                e.detail().map(str::to_string),
            );
        }

        self.status.settle();
    }

    async fn run_cycle(
        &self,
        content_type: ContentType,
        source: TriggerSource,
        creds: &Credentials,
    ) -> Result<(), TaskError> {
        let label = source.label();

        if content_type == ContentType::Image {
            // Both generation calls count as fetching; the image path never
            // passes through Sending.
            self.log
                .pending(format!("[{label}] Generating quote and image..."));
            let quote = self.provider.generate_text(&creds.gemini_api_key).await?;

            self.log
                .pending("Quote ready, rendering the illustration (10-20s)...");
            let image = self
                .provider
                .generate_image(&creds.gemini_api_key, &quote)
                .await?;

            self.log.pending("Image ready, sending to Telegram...");
            self.channel
                .send_photo(&creds.bot_token, &creds.chat_id, &image, &quote)
                .await?;
            self.log
                .success(format!("[{label}] Photo message delivered."));
            return Ok(());
        }

        self.log.pending(format!("[{label}] Generating quote..."));
        let quote = self.provider.generate_text(&creds.gemini_api_key).await?;
        self.log
            .success(format!("Quote ready: \"{}...\"", preview(&quote, 30)));

        self.status.set(ExecutionStatus::Sending);
        self.log.pending("Sending message...");
        self.channel
            .send_text(&creds.bot_token, &creds.chat_id, &quote)
            .await?;
        self.log.success(format!("[{label}] Message delivered."));

        if source == TriggerSource::Interval {
            // Defensive re-arm; the countdown's own zero-crossing also
            // resets, and last write wins.
            self.interval.reset();
        }

        Ok(())
    }

    /// Deliver an operator-written quote as a photo with a generated
    /// illustration. Same status discipline as the image path.
    pub async fn execute_custom(&self, quote: &str) {
        let quote = quote.trim();
        if quote.is_empty() {
            self.log.error("Write a quote before sending.", None);
            self.status.settle();
            return;
        }
        let creds = self.credentials();
        if !creds.is_complete() {
            self.log.error(
                "Bot token, chat ID and Gemini API key are required.",
                None,
            );
            self.status.settle();
            return;
        }

        self.status.set(ExecutionStatus::FetchingContent);

        let result: Result<(), TaskError> = async {
            self.log
                .pending("[manual] Rendering an illustration for the custom quote...");
            let image = self
                .provider
                .generate_image(&creds.gemini_api_key, quote)
                .await?;

            self.log.pending("Image ready, sending to Telegram...");
            self.channel
                .send_photo(&creds.bot_token, &creds.chat_id, &image, quote)
                .await?;
            self.log
                .success("[manual] Custom photo message delivered.");
            Ok(())
        }
        .await;

        if let Err(e) = result {
            self.log.error(
                format!("Custom send failed: {e}"),
                e.detail().map(str::to_string),
            );
        }

        self.status.settle();
    }
}

/// First `max_chars` characters, safe on multi-byte text.
fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use quotebot_types::LogStatus;

    use crate::testing::{StubChannel, StubProvider, test_credentials};

    struct Fixture {
        provider: Arc<StubProvider>,
        channel: Arc<StubChannel>,
        status: Arc<StatusCell>,
        log: Arc<LogStream>,
        interval: Arc<IntervalScheduler>,
        executor: TaskExecutor,
    }

    fn fixture_with(credentials: Credentials) -> Fixture {
        let provider = Arc::new(StubProvider::default());
        let channel = Arc::new(StubChannel::default());
        let status = Arc::new(StatusCell::new());
        let log = Arc::new(LogStream::new());
        let interval = Arc::new(IntervalScheduler::new(status.clone(), 1));
        let executor = TaskExecutor::new(
            provider.clone(),
            channel.clone(),
            status.clone(),
            log.clone(),
            interval.clone(),
            credentials,
        );
        Fixture {
            provider,
            channel,
            status,
            log,
            interval,
            executor,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(test_credentials())
    }

    #[tokio::test]
    async fn test_text_task_delivers_quote() {
        let f = fixture();
        f.executor
            .execute(ContentType::Text, TriggerSource::Manual)
            .await;

        assert_eq!(f.channel.sent_texts.lock().unwrap().as_slice(), ["hello"]);
        assert_eq!(f.status.get(), ExecutionStatus::Idle);
        let entries = f.log.snapshot();
        assert_eq!(entries[0].status, LogStatus::Success);
        assert!(entries[0].message.contains("[manual]"));
    }

    #[tokio::test]
    async fn test_image_task_never_passes_through_sending() {
        let f = fixture();
        *f.channel.watch_status.lock().unwrap() = Some(f.status.clone());

        f.executor
            .execute(ContentType::Image, TriggerSource::Schedule)
            .await;

        assert_eq!(f.provider.text_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(f.provider.image_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(f.channel.sent_photos.lock().unwrap().len(), 1);
        // Status observed at send_photo time is still FetchingContent
        assert_eq!(
            f.channel.observed_statuses.lock().unwrap().as_slice(),
            [ExecutionStatus::FetchingContent]
        );
        assert_eq!(f.status.get(), ExecutionStatus::Idle);
    }

    #[tokio::test]
    async fn test_text_task_sends_through_sending_status() {
        let f = fixture();
        *f.channel.watch_status.lock().unwrap() = Some(f.status.clone());

        f.executor
            .execute(ContentType::Text, TriggerSource::Manual)
            .await;

        assert_eq!(
            f.channel.observed_statuses.lock().unwrap().as_slice(),
            [ExecutionStatus::Sending]
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_ends_not_busy() {
        let f = fixture_with(Credentials::default());
        f.status.set_armed(true);
        f.status.set(ExecutionStatus::Running);

        f.executor
            .execute(ContentType::Text, TriggerSource::Interval)
            .await;

        assert_eq!(f.status.get(), ExecutionStatus::Running);
        assert_eq!(f.provider.text_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(f.log.snapshot()[0].status, LogStatus::Error);
    }

    #[tokio::test]
    async fn test_missing_credentials_releases_prior_claim() {
        let f = fixture_with(Credentials::default());
        f.status.set_armed(true);
        f.status.set(ExecutionStatus::Running);
        assert!(f.status.try_begin());

        f.executor
            .execute(ContentType::Text, TriggerSource::Schedule)
            .await;

        // A claim taken by the triggering scheduler must not outlive the
        // aborted cycle
        assert_eq!(f.status.get(), ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn test_generation_failure_restores_status_no_delivery() {
        let f = fixture();
        *f.provider.text_result.lock().unwrap() = Err(TaskError::QuotaExceeded {
            detail: "RESOURCE_EXHAUSTED".into(),
        });
        f.status.set_armed(true);

        f.executor
            .execute(ContentType::Text, TriggerSource::Interval)
            .await;

        // No partial delivery attempted
        assert!(f.channel.sent_texts.lock().unwrap().is_empty());
        assert_eq!(f.status.get(), ExecutionStatus::Running);

        let top = &f.log.snapshot()[0];
        assert_eq!(top.status, LogStatus::Error);
        assert!(top.message.contains("429"));
        assert_eq!(top.details.as_deref(), Some("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_delivery_failure_restores_status() {
        let f = fixture();
        *f.channel.photo_result.lock().unwrap() = Some(TaskError::RemoteRejected {
            description: "chat not found".into(),
        });

        f.executor
            .execute(ContentType::Image, TriggerSource::Manual)
            .await;

        assert_eq!(f.status.get(), ExecutionStatus::Idle);
        let top = &f.log.snapshot()[0];
        assert_eq!(top.status, LogStatus::Error);
        assert!(top.message.contains("chat not found"));
    }

    #[tokio::test]
    async fn test_interval_trigger_rearms_countdown() {
        let f = fixture();
        f.status.set_armed(true);
        f.status.set(ExecutionStatus::Running);
        for _ in 0..25 {
            f.interval.tick();
        }
        assert_eq!(f.interval.seconds_left(), 35);

        f.executor
            .execute(ContentType::Text, TriggerSource::Interval)
            .await;
        assert_eq!(f.interval.seconds_left(), 60);
        assert_eq!(f.status.get(), ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn test_manual_trigger_does_not_rearm_countdown() {
        let f = fixture();
        f.status.set_armed(true);
        f.status.set(ExecutionStatus::Running);
        for _ in 0..25 {
            f.interval.tick();
        }

        f.executor
            .execute(ContentType::Text, TriggerSource::Manual)
            .await;
        assert_eq!(f.interval.seconds_left(), 35);
    }

    #[tokio::test]
    async fn test_custom_quote_sent_as_photo_caption() {
        let f = fixture();
        f.executor.execute_custom("  To be, or not to be.  ").await;

        let photos = f.channel.sent_photos.lock().unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].1, "To be, or not to be.");
        // Custom path generates no quote text
        assert_eq!(f.provider.text_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(f.status.get(), ExecutionStatus::Idle);
    }

    #[tokio::test]
    async fn test_custom_quote_rejects_empty_input() {
        let f = fixture();
        f.executor.execute_custom("   ").await;
        assert_eq!(f.provider.image_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(f.log.snapshot()[0].status, LogStatus::Error);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("çok güzel bir söz", 7), "çok güz");
        assert_eq!(preview("short", 30), "short");
    }
}
