//! Clock abstraction used to stamp persistence times.

use chrono::{DateTime, Utc};

/// Source of "now" for event stores, so persisted timestamps can be fixed in
/// tests.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
