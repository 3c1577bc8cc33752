//! The coordinator façade: owns the shared state, exposes the operator
//! surface, and runs both scheduler loops.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use quotebot_types::{ContentType, ExecutionStatus, LogEntry, ScheduleEntry, TriggerSource};

use crate::daily::DailyScheduler;
use crate::executor::{Credentials, TaskExecutor};
use crate::interval::IntervalScheduler;
use crate::log::LogStream;
use crate::provider::{ContentProvider, DeliveryChannel};
use crate::registry::{RegistryError, ScheduleRegistry};
use crate::status::StatusCell;

pub struct QuoteBot {
    status: Arc<StatusCell>,
    log: Arc<LogStream>,
    registry: Arc<ScheduleRegistry>,
    interval: Arc<IntervalScheduler>,
    daily: Arc<DailyScheduler>,
    executor: Arc<TaskExecutor>,
}

impl QuoteBot {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        channel: Arc<dyn DeliveryChannel>,
        credentials: Credentials,
        interval_minutes: u64,
    ) -> Self {
        let status = Arc::new(StatusCell::new());
        let log = Arc::new(LogStream::new());
        let registry = Arc::new(ScheduleRegistry::new());
        let interval = Arc::new(IntervalScheduler::new(status.clone(), interval_minutes));
        let daily = Arc::new(DailyScheduler::new(
            registry.clone(),
            status.clone(),
            log.clone(),
        ));
        let executor = Arc::new(TaskExecutor::new(
            provider,
            channel,
            status.clone(),
            log.clone(),
            interval.clone(),
            credentials,
        ));
        Self {
            status,
            log,
            registry,
            interval,
            daily,
            executor,
        }
    }

    // ──────────────────── Arming ────────────────────

    /// Arm the interval countdown. Refused (with a log entry) when the
    /// credential set is incomplete.
    pub fn arm(&self) -> bool {
        if !self.executor.credentials().is_complete() {
            self.log.error(
                "Fill in the bot token, chat ID and API key before starting the countdown.",
                None,
            );
            return false;
        }
        self.status.set_armed(true);
        if !self.status.is_busy() {
            self.status.set(ExecutionStatus::Running);
        }
        self.log.success("Automatic periodic sending started.");
        true
    }

    /// Disarm the countdown and reset it to the full interval. A task
    /// already in flight is not interrupted; it settles to Idle on its own.
    pub fn disarm(&self) {
        self.status.set_armed(false);
        self.interval.reset();
        if !self.status.is_busy() {
            self.status.set(ExecutionStatus::Idle);
        }
        self.log.pending("Automatic periodic sending stopped.");
    }

    pub fn armed(&self) -> bool {
        self.status.armed()
    }

    // ──────────────────── Triggers ────────────────────

    /// Manual trigger. Refused with a log entry while a task is in flight;
    /// the busy slot is claimed atomically so a trigger racing a scheduler
    /// tick cannot start a second task.
    pub async fn trigger(&self, content_type: ContentType) {
        if !self.status.try_begin() {
            self.log
                .error("Manual trigger ignored: the bot is busy.", None);
            return;
        }
        self.executor
            .execute(content_type, TriggerSource::Manual)
            .await;
    }

    /// Deliver an operator-written quote with a generated illustration.
    pub async fn send_custom(&self, quote: &str) {
        if !self.status.try_begin() {
            self.log
                .error("Custom send ignored: the bot is busy.", None);
            return;
        }
        self.executor.execute_custom(quote).await;
    }

    // ──────────────────── Schedule registry ────────────────────

    /// Add a time-of-day entry. Duplicate times are rejected and surfaced as
    /// a warning in the log stream; the registry is unchanged.
    pub fn add_schedule(
        &self,
        time: &str,
        content_type: ContentType,
    ) -> Result<ScheduleEntry, RegistryError> {
        match self.registry.add(time, content_type) {
            Ok(entry) => {
                self.log.success(format!(
                    "Scheduled task added: {} ({})",
                    entry.time,
                    entry.content_type.label()
                ));
                Ok(entry)
            }
            Err(e) => {
                self.log.error(e.to_string(), None);
                Err(e)
            }
        }
    }

    pub fn remove_schedule(&self, id: &str) -> bool {
        self.registry.remove(id)
    }

    pub fn schedules(&self) -> Vec<ScheduleEntry> {
        self.registry.entries()
    }

    // ──────────────────── Introspection ────────────────────

    pub fn status(&self) -> ExecutionStatus {
        self.status.get()
    }

    pub fn seconds_left(&self) -> u64 {
        self.interval.seconds_left()
    }

    pub fn set_interval_minutes(&self, minutes: u64) {
        self.interval.set_interval_minutes(minutes);
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        self.executor.set_credentials(credentials);
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.log.snapshot()
    }

    pub fn clear_logs(&self) {
        self.log.clear();
    }

    // ──────────────────── Scheduler loops ────────────────────

    /// Spawn both one-second loops. They stop on cancellation; an in-flight
    /// task is awaited by its own loop, never abandoned mid-cycle.
    pub fn spawn_schedulers(&self, cancel: CancellationToken) -> (JoinHandle<()>, JoinHandle<()>) {
        let interval_handle = tokio::spawn(run_interval_loop(
            self.interval.clone(),
            self.executor.clone(),
            cancel.child_token(),
        ));
        let daily_handle = tokio::spawn(run_daily_loop(
            self.daily.clone(),
            self.executor.clone(),
            cancel.child_token(),
        ));
        (interval_handle, daily_handle)
    }
}

/// Drive the interval countdown. A firing tick claims the busy status
/// synchronously, so no other timing source can commit to the same slot;
/// the executor is awaited inline and settles the claim.
async fn run_interval_loop(
    interval: Arc<IntervalScheduler>,
    executor: Arc<TaskExecutor>,
    cancel: CancellationToken,
) {
    info!("Interval scheduler started");
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tick.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {}
        }
        if interval.tick() {
            executor
                .execute(ContentType::Text, TriggerSource::Interval)
                .await;
        }
    }
    info!("Interval scheduler stopped");
}

/// Drive the time-of-day watcher against the local wall clock.
async fn run_daily_loop(
    daily: Arc<DailyScheduler>,
    executor: Arc<TaskExecutor>,
    cancel: CancellationToken,
) {
    info!("Time-of-day scheduler started");
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tick.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {}
        }
        if let Some(entry) = daily.tick(Local::now().naive_local()) {
            executor
                .execute(entry.content_type, TriggerSource::Schedule)
                .await;
        }
    }
    info!("Time-of-day scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::Ordering;

    use chrono::NaiveDate;

    use quotebot_types::LogStatus;

    use crate::testing::{StubChannel, StubProvider, test_credentials};

    fn bot_with_stubs(interval_minutes: u64) -> (Arc<StubProvider>, Arc<StubChannel>, QuoteBot) {
        let provider = Arc::new(StubProvider::default());
        let channel = Arc::new(StubChannel::default());
        let bot = QuoteBot::new(
            provider.clone(),
            channel.clone(),
            test_credentials(),
            interval_minutes,
        );
        (provider, channel, bot)
    }

    /// Simulate the interval loop body: one decision per tick, execution
    /// awaited inline when the countdown fires.
    async fn simulate_interval_ticks(bot: &QuoteBot, ticks: u32) {
        for _ in 0..ticks {
            if bot.interval.tick() {
                bot.executor
                    .execute(ContentType::Text, TriggerSource::Interval)
                    .await;
            }
        }
    }

    #[tokio::test]
    async fn test_armed_interval_delivers_exactly_once_per_minute() {
        let (_, channel, bot) = bot_with_stubs(1);
        assert!(bot.arm());

        simulate_interval_ticks(&bot, 60).await;

        assert_eq!(channel.sent_texts.lock().unwrap().as_slice(), ["hello"]);
        assert_eq!(bot.seconds_left(), 60);
        assert_eq!(bot.status(), ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn test_disarmed_interval_never_fires() {
        let (_, channel, bot) = bot_with_stubs(1);

        simulate_interval_ticks(&bot, 600).await;

        assert!(channel.sent_texts.lock().unwrap().is_empty());
        assert_eq!(bot.status(), ExecutionStatus::Idle);
    }

    #[tokio::test]
    async fn test_scheduled_image_task_end_to_end() {
        let (provider, channel, bot) = bot_with_stubs(10);
        bot.add_schedule("09:00", ContentType::Image).unwrap();

        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let entry = bot.daily.tick(now).expect("schedule should fire");
        bot.executor
            .execute(entry.content_type, TriggerSource::Schedule)
            .await;

        assert_eq!(provider.text_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.image_calls.load(Ordering::SeqCst), 1);
        assert_eq!(channel.sent_photos.lock().unwrap().len(), 1);
        assert_eq!(bot.status(), ExecutionStatus::Idle);
    }

    #[tokio::test]
    async fn test_arm_requires_credentials() {
        let provider = Arc::new(StubProvider::default());
        let channel = Arc::new(StubChannel::default());
        let bot = QuoteBot::new(provider, channel, Credentials::default(), 10);

        assert!(!bot.arm());
        assert_eq!(bot.status(), ExecutionStatus::Idle);
        assert_eq!(bot.logs()[0].status, LogStatus::Error);
    }

    #[tokio::test]
    async fn test_disarm_resets_countdown_and_settles_idle() {
        let (_, _, bot) = bot_with_stubs(1);
        bot.arm();
        simulate_interval_ticks(&bot, 15).await;
        assert_eq!(bot.seconds_left(), 45);

        bot.disarm();
        assert!(!bot.armed());
        assert_eq!(bot.seconds_left(), 60);
        assert_eq!(bot.status(), ExecutionStatus::Idle);
    }

    #[tokio::test]
    async fn test_manual_trigger_refused_while_busy() {
        let (provider, _, bot) = bot_with_stubs(10);
        bot.status.set(ExecutionStatus::FetchingContent);

        bot.trigger(ContentType::Text).await;

        assert_eq!(provider.text_calls.load(Ordering::SeqCst), 0);
        assert_eq!(bot.logs()[0].status, LogStatus::Error);
    }

    #[tokio::test]
    async fn test_duplicate_schedule_surfaced_in_log() {
        let (_, _, bot) = bot_with_stubs(10);
        bot.add_schedule("09:00", ContentType::Text).unwrap();
        assert!(bot.add_schedule("09:00", ContentType::Image).is_err());

        assert_eq!(bot.schedules().len(), 1);
        let top = &bot.logs()[0];
        assert_eq!(top.status, LogStatus::Error);
        assert!(top.message.contains("09:00"));
    }

    #[tokio::test]
    async fn test_schedule_fire_keeps_interval_countdown_paused_not_reset() {
        let (_, _, bot) = bot_with_stubs(1);
        bot.arm();
        simulate_interval_ticks(&bot, 20).await;
        assert_eq!(bot.seconds_left(), 40);

        // A schedule-triggered task holds busy status; interval ticks during
        // that window neither decrement nor reset.
        bot.status.set(ExecutionStatus::FetchingContent);
        simulate_interval_ticks(&bot, 10).await;
        assert_eq!(bot.seconds_left(), 40);

        bot.status.settle();
        simulate_interval_ticks(&bot, 1).await;
        assert_eq!(bot.seconds_left(), 39);
    }

    #[tokio::test]
    async fn test_same_instant_fires_start_only_one_task() {
        let (_, channel, bot) = bot_with_stubs(1);
        bot.add_schedule("09:00", ContentType::Text).unwrap();
        bot.add_schedule("09:01", ContentType::Image).unwrap();
        bot.arm();

        // Bring the countdown to its zero-crossing: the next tick would fire.
        for _ in 0..59 {
            assert!(!bot.interval.tick());
        }
        assert_eq!(bot.seconds_left(), 1);

        // The time-of-day tick lands first in the same second and claims.
        let nine = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let entry = bot.daily.tick(nine).expect("schedule should fire");
        assert_eq!(bot.status(), ExecutionStatus::FetchingContent);

        // The interval tick in the same second must not start a second task,
        // and its countdown holds rather than resets.
        assert!(!bot.interval.tick());
        assert_eq!(bot.seconds_left(), 1);

        bot.executor
            .execute(entry.content_type, TriggerSource::Schedule)
            .await;
        assert_eq!(bot.status(), ExecutionStatus::Running);
        assert_eq!(channel.sent_texts.lock().unwrap().len(), 1);

        // Reverse order one minute later: the interval claim wins and the
        // time-of-day tick records a busy skip instead of firing.
        assert!(bot.interval.tick());
        let nine_oh_one = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 1, 0)
            .unwrap();
        assert!(bot.daily.tick(nine_oh_one).is_none());
        let top = &bot.logs()[0];
        assert_eq!(top.status, LogStatus::Error);
        assert!(top.message.contains("busy"));
    }

    #[tokio::test]
    async fn test_spawned_loops_stop_on_cancel() {
        let (_, _, bot) = bot_with_stubs(10);
        let cancel = CancellationToken::new();
        let (interval_handle, daily_handle) = bot.spawn_schedulers(cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), async {
            interval_handle.await.unwrap();
            daily_handle.await.unwrap();
        })
        .await
        .expect("scheduler loops should exit promptly on cancel");
    }

    #[tokio::test]
    async fn test_clear_logs() {
        let (_, _, bot) = bot_with_stubs(10);
        bot.arm();
        assert!(!bot.logs().is_empty());
        bot.clear_logs();
        assert!(bot.logs().is_empty());
    }
}
