//! Wall-clock abstraction for testability
//!
//! Production code uses [`SystemClock`]; tests use [`MockClock`] to get
//! deterministic, strictly controlled timestamps.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    /// Milliseconds since the UNIX epoch
    fn now_millis(&self) -> i64;
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        // Clocks set before 1970 collapse to zero rather than failing
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same underlying instant, so a clock handed to a service
/// can be advanced from the test body.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "runtime")]
/// # {
/// use std::time::Duration;
///
/// use carebridge_common::time::{Clock, MockClock};
///
/// let clock = MockClock::at(1_000);
/// let shared = clock.clone();
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(shared.now_millis(), 1_250);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    millis: Arc<AtomicI64>,
}

impl MockClock {
    /// Create a mock clock starting at the current real time
    pub fn new() -> Self {
        Self::at(SystemClock.now_millis())
    }

    /// Create a mock clock pinned to `millis` since the epoch
    pub fn at(millis: i64) -> Self {
        Self { millis: Arc::new(AtomicI64::new(millis)) }
    }

    /// Move the clock forward without waiting
    pub fn advance(&self, duration: Duration) {
        let delta = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute instant
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
