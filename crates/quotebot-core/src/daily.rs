//! Wall-clock time-of-day scheduler.

use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;

use quotebot_types::ScheduleEntry;

use crate::log::LogStream;
use crate::registry::ScheduleRegistry;
use crate::status::StatusCell;

/// Watches the wall clock on a one-second tick and fires registry entries
/// whose HH:MM matches the current minute. Runs for the life of the process,
/// independent of the armed flag.
///
/// The tick period is finer than the schedule resolution, so each firing (or
/// busy skip) consumes its minute: the marker is date-qualified, which keeps
/// the within-minute dedupe and still lets the entry fire at its next daily
/// occurrence.
pub struct DailyScheduler {
    registry: Arc<ScheduleRegistry>,
    status: Arc<StatusCell>,
    log: Arc<LogStream>,
    last_triggered: Mutex<Option<String>>,
}

impl DailyScheduler {
    pub fn new(
        registry: Arc<ScheduleRegistry>,
        status: Arc<StatusCell>,
        log: Arc<LogStream>,
    ) -> Self {
        Self {
            registry,
            status,
            log,
            last_triggered: Mutex::new(None),
        }
    }

    /// One 1-second tick at the given local time. Returns the entry to
    /// execute, with the busy slot already claimed for the caller; busy
    /// skips are logged here and consume the minute without returning an
    /// entry.
    pub fn tick(&self, now: NaiveDateTime) -> Option<ScheduleEntry> {
        let minute_key = now.format("%Y-%m-%d %H:%M").to_string();

        let mut last = self.last_triggered.lock().unwrap();
        if last.as_deref() == Some(minute_key.as_str()) {
            return None;
        }

        let time = now.format("%H:%M").to_string();
        let entry = self.registry.find_by_time(&time)?;

        // Claim the busy slot atomically; a task already in flight (or a
        // concurrent claim from another trigger) turns this firing into a
        // skip that still consumes the minute.
        if !self.status.try_begin() {
            self.log.error(
                format!("Scheduled task ({}) skipped: the bot is busy.", entry.time),
                None,
            );
            *last = Some(minute_key);
            return None;
        }

        self.log.pending(format!(
            "Scheduled task triggered: {} ({})",
            entry.time,
            entry.content_type.label()
        ));
        *last = Some(minute_key);
        Some(entry)
    }
}
