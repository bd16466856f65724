//! Injected dependencies for the engine.
//!
//! External concerns are abstracted behind traits and passed in as
//! `Arc<dyn Trait>` so hold expiry, future-dating, and payment outcomes
//! are deterministic under test.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// Production uses [`SystemClock`]; tests use a controllable clock so
/// hold expiry can be driven without sleeping.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
