//! Time source for every lifecycle check.
//!
//! Expiration and visibility are evaluated lazily against [`Clock::now`], so
//! the clock is injected into each store rather than read from the wall
//! directly. Tests drive a [`ManualClock`] instead of sleeping.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Supplies "now" to the stores. Implementations must never go backwards.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock clamped to be monotonic.
///
/// If the system clock steps backwards (NTP correction, manual change) the
/// last returned instant is repeated until the wall catches up again, so an
/// identity that was expired never becomes live again.
#[derive(Debug)]
pub struct SystemClock {
    last: Mutex<DateTime<Utc>>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(Utc::now()),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock();
        let wall = Utc::now();
        if wall > *last {
            *last = wall;
        }
        *last
    }
}

/// Hand-driven clock for tests and simulations. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward. Negative durations are ignored.
    pub fn advance(&self, delta: Duration) {
        if delta > Duration::zero() {
            *self.now.lock() += delta;
        }
    }

    /// Jump to `at` if it is not earlier than the current time.
    pub fn set(&self, at: DateTime<Utc>) {
        let mut now = self.now.lock();
        if at > *now {
            *now = at;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
