//! Time source for retention deadlines.
//!
//! Production code uses [`SystemClock`]; tests drive [`FakeClock`] forward explicitly so that
//! retention-window behavior is deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock backed [`Clock`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct FakeClock {
    origin: Instant,
    offset_ms: AtomicU64,
}

impl FakeClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.offset_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}
