//! Observational log stream.
//!
//! Append-only from the coordinator's perspective, newest first, cleared only
//! in bulk. Never consulted for scheduling decisions. Entries are mirrored to
//! `tracing` so the same events reach structured logs.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::{info, warn};

use quotebot_types::{LogEntry, LogStatus};

pub struct LogStream {
    entries: Mutex<VecDeque<LogEntry>>,
}

impl Default for LogStream {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStream {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, message: impl Into<String>, status: LogStatus, details: Option<String>) {
        let entry = LogEntry::new(message, status, details);
        match entry.status {
            LogStatus::Error => {
                warn!(details = entry.details.as_deref(), "{}", entry.message);
            }
            _ => info!("{}", entry.message),
        }
        self.entries.lock().unwrap().push_front(entry);
    }

    pub fn pending(&self, message: impl Into<String>) {
        self.push(message, LogStatus::Pending, None);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(message, LogStatus::Success, None);
    }

    pub fn error(&self, message: impl Into<String>, details: Option<String>) {
        self.push(message, LogStatus::Error, details);
    }

    /// Snapshot, newest entry first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
