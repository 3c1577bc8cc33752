//! Registry of time-of-day schedule entries.

use std::sync::Mutex;

use chrono::NaiveTime;
use thiserror::Error;

use quotebot_types::{ContentType, ScheduleEntry};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a scheduled task already exists for {0}")]
    DuplicateTime(String),
    #[error("invalid time {0:?}, expected 24-hour HH:MM")]
    InvalidTime(String),
}

/// Set of schedule entries, at most one per distinct time, kept sorted by
/// time ascending. Sort order is presentational only; firing is driven by
/// exact minute matches.
pub struct ScheduleRegistry {
    entries: Mutex<Vec<ScheduleEntry>>,
}

impl Default for ScheduleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Add an entry. Rejects malformed times and duplicate times; on success
    /// the stored time is normalized to zero-padded HH:MM.
    pub fn add(
        &self,
        time: &str,
        content_type: ContentType,
    ) -> Result<ScheduleEntry, RegistryError> {
        let parsed = NaiveTime::parse_from_str(time, "%H:%M")
            .map_err(|_| RegistryError::InvalidTime(time.to_string()))?;
        let time = parsed.format("%H:%M").to_string();

        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.time == time) {
            return Err(RegistryError::DuplicateTime(time));
        }

        let entry = ScheduleEntry::new(time, content_type);
        entries.push(entry.clone());
        entries.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(entry)
    }

    /// Remove the entry with the given id. No-op (false) when absent.
    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() < before
    }

    /// Entry whose time matches the given HH:MM key, if any. Unique times
    /// guarantee at most one match.
    pub fn find_by_time(&self, time: &str) -> Option<ScheduleEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.time == time)
            .cloned()
    }

    /// Sorted snapshot for display.
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
