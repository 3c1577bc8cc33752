//! Recurring interval countdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use quotebot_types::ExecutionStatus;

use crate::status::StatusCell;

/// One-second countdown that fires a text task when it reaches zero.
///
/// The decrement is gated on the armed flag and on status == Running, so a
/// task in flight (from any trigger source) pauses the countdown without
/// resetting it; ticking resumes from the remaining count once the status
/// settles back to Running.
pub struct IntervalScheduler {
    status: Arc<StatusCell>,
    seconds_left: Mutex<u64>,
    interval_secs: AtomicU64,
}

impl IntervalScheduler {
    pub fn new(status: Arc<StatusCell>, interval_minutes: u64) -> Self {
        let interval_secs = interval_minutes.max(1) * 60;
        Self {
            status,
            seconds_left: Mutex::new(interval_secs),
            interval_secs: AtomicU64::new(interval_secs),
        }
    }

    /// One 1-second tick. Returns true when the countdown fired; the caller
    /// runs the task. Firing claims the busy slot and resets the countdown
    /// to the full interval.
    pub fn tick(&self) -> bool {
        if !self.status.armed() || self.status.get() != ExecutionStatus::Running {
            return false;
        }

        let mut left = self.seconds_left.lock().unwrap();
        if *left <= 1 {
            // The claim can lose to a concurrent trigger even though the
            // status read Running above; the countdown then holds at zero
            // until the status settles back to Running.
            if !self.status.try_begin() {
                return false;
            }
            *left = self.interval_secs.load(Ordering::SeqCst);
            true
        } else {
            *left -= 1;
            false
        }
    }

    /// Reset the countdown to the full interval. Idempotent, last-write-wins;
    /// also used by the executor as a defensive re-arm after an
    /// interval-triggered delivery.
    pub fn reset(&self) {
        *self.seconds_left.lock().unwrap() = self.interval_secs.load(Ordering::SeqCst);
    }

    /// Change the interval. While disarmed the displayed countdown resets to
    /// the new full duration immediately; while armed the in-progress
    /// countdown is untouched until its next natural reset.
    pub fn set_interval_minutes(&self, minutes: u64) {
        self.interval_secs
            .store(minutes.max(1) * 60, Ordering::SeqCst);
        if !self.status.armed() {
            self.reset();
        }
    }

    pub fn seconds_left(&self) -> u64 {
        *self.seconds_left.lock().unwrap()
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::SeqCst)
    }
}
