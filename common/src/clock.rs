//! Clock abstraction for wall-clock reads.
//!
//! Production code uses [`SystemClock`]; tests inject [`MockClock`] so that
//! time-relative behavior (timestamp expressions, default append times) is
//! deterministic.

use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;

    /// Current time as milliseconds since the Unix epoch.
    ///
    /// Times before the epoch are clamped to zero; the store's timestamp
    /// domain starts at the epoch.
    fn now_ms(&self) -> i64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Clock backed by the operating system.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually controlled clock for tests.
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<SystemTime>,
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        *self.now.read().unwrap()
    }
}

impl MockClock {
    pub fn with_time(time: SystemTime) -> Self {
        Self {
            now: RwLock::new(time),
        }
    }

    /// Creates a clock fixed at the given epoch-millisecond instant.
    pub fn at_ms(epoch_ms: u64) -> Self {
        Self::with_time(UNIX_EPOCH + Duration::from_millis(epoch_ms))
    }

    pub fn new() -> Self {
        Self::with_time(SystemTime::now())
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.write().unwrap();
        *now += duration;
    }

    pub fn set_time(&self, time: SystemTime) {
        *self.now.write().unwrap() = time;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}
