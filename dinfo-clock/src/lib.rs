//! Clock abstraction for debug-info.
//!
//! Provides a trait for reading the local wall-clock time, with real and mock
//! implementations so run directory and counter directory names are
//! deterministic under test.

use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};

/// Format of the per-run timestamp (microsecond granularity).
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%6f";

/// Format of the timestamp suffix on counter snapshot directories.
pub const COUNTER_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Trait for getting the current local time.
pub trait Clock: Send + Sync {
    /// Returns the current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

/// Real system clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Mock clock for testing with a fixed time.
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    now: NaiveDateTime,
}

impl MockClock {
    /// Create a mock clock that always returns `now`.
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }
}

impl Clock for MockClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }
}

/// Mock clock that auto-advances time on each call.
///
/// Useful for tests that take several timestamps in one run (pre and post
/// counter snapshots, back-to-back collections).
#[derive(Debug)]
pub struct AdvancingClock {
    now: Mutex<NaiveDateTime>,
    step: Duration,
}

impl AdvancingClock {
    /// Create an advancing clock starting at `start` and moving forward by `step` each call.
    pub fn new(start: NaiveDateTime, step: Duration) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }
}

impl Clock for AdvancingClock {
    fn now(&self) -> NaiveDateTime {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        let current = *now;
        *now = current + self.step;
        current
    }
}

/// Format the timestamp used in run directory and archive names.
/// Format: YYYYMMDD_HHMMSSffffff
pub fn run_timestamp(at: &NaiveDateTime) -> String {
    at.format(RUN_TIMESTAMP_FORMAT).to_string()
}

/// Name of a counter snapshot directory, e.g. `pre_counter_20240101_000000`.
pub fn counter_dir_name(prefix: &str, at: &NaiveDateTime) -> String {
    format!("{}counter_{}", prefix, at.format(COUNTER_TIMESTAMP_FORMAT))
}
