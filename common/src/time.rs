//! Time source used to stamp events and measure poll durations.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at the given time.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
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

/// Shared handle on a clock.
pub type SharedClock = Arc<dyn Clock>;

/// Default clock handle.
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Elapsed time between two instants, never negative.
pub fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    let elapsed = to.signed_duration_since(from);
    if elapsed < Duration::zero() {
        Duration::zero()
    } else {
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::default();
        let start = clock.now();
        let shared = clock.clone();
        shared.advance(Duration::seconds(90));
        assert_eq!(elapsed(start, clock.now()), Duration::seconds(90));
    }

    #[test]
    fn test_elapsed_never_negative() {
        let now = Utc::now();
        assert_eq!(elapsed(now, now - Duration::seconds(5)), Duration::zero());
    }
}
