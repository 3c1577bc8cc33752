//! Shared execution status and armed flag.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use quotebot_types::ExecutionStatus;

/// The single authoritative status value shared by both schedulers and
/// manual triggers. There is no other lock: every timing source claims this
/// cell through `try_begin` before starting a task, and the executor
/// settles it when the task ends.
pub struct StatusCell {
    status: Mutex<ExecutionStatus>,
    armed: AtomicBool,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    /// Start disarmed and idle.
    pub fn new() -> Self {
        Self {
            status: Mutex::new(ExecutionStatus::Idle),
            armed: AtomicBool::new(false),
        }
    }

    pub fn get(&self) -> ExecutionStatus {
        *self.status.lock().unwrap()
    }

    pub fn set(&self, status: ExecutionStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn is_busy(&self) -> bool {
        self.get().is_busy()
    }

    /// Atomically claim the busy slot: under a single lock hold, refuse when
    /// a task is already in flight, otherwise mark content fetching. Every
    /// timing source claims through here before invoking the executor, so
    /// two ticks racing on parallel workers cannot both start a task.
    pub fn try_begin(&self) -> bool {
        let mut status = self.status.lock().unwrap();
        if status.is_busy() {
            return false;
        }
        *status = ExecutionStatus::FetchingContent;
        true
    }

    pub fn armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::SeqCst);
    }

    /// Return to whichever not-busy state reflects the armed flag.
    pub fn settle(&self) {
        let status = if self.armed() {
            ExecutionStatus::Running
        } else {
            ExecutionStatus::Idle
        };
        self.set(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle_and_disarmed() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), ExecutionStatus::Idle);
        assert!(!cell.armed());
        assert!(!cell.is_busy());
    }

    #[test]
    fn test_try_begin_claims_at_most_once() {
        let cell = StatusCell::new();
        assert!(cell.try_begin());
        assert_eq!(cell.get(), ExecutionStatus::FetchingContent);

        // Second claim loses until the first one settles
        assert!(!cell.try_begin());
        cell.settle();
        assert!(cell.try_begin());
    }

    #[test]
    fn test_settle_follows_armed_flag() {
        let cell = StatusCell::new();
        cell.set(ExecutionStatus::FetchingContent);
        cell.settle();
        assert_eq!(cell.get(), ExecutionStatus::Idle);

        cell.set_armed(true);
        cell.set(ExecutionStatus::Sending);
        cell.settle();
        assert_eq!(cell.get(), ExecutionStatus::Running);
    }
}
