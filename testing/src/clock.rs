//! Controllable clock for deterministic expiry tests.

use carebook_core::environment::Clock;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// A clock that only moves when the test says so.
///
/// # Example
///
/// ```ignore
/// let clock = Arc::new(MockClock::starting_at(start));
/// store.claim_segment(segment, client, Duration::minutes(5)).await?;
/// clock.advance(Duration::minutes(6));
/// // the hold is now lapsed
/// ```
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    /// Creates a clock frozen at the given instant
    #[must_use]
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Creates a clock frozen at the real current time
    #[must_use]
    pub fn starting_now() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Moves the clock forward
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a previous test panic).
    #[allow(clippy::unwrap_used)]
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    /// Pins the clock to an exact instant
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a previous test panic).
    #[allow(clippy::unwrap_used)]
    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap();
        *now = to;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::starting_now()
    }
}

impl Clock for MockClock {
    #[allow(clippy::unwrap_used)]
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
