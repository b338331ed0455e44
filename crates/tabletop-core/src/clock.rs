//! Time source for vote deadlines and event timestamps.

use chrono::{DateTime, Utc};

/// Source of "now". Vote windows, expiry sweeps and event metadata all read
/// time through this, so tests can pin or advance it.
pub trait Clock: Send + Sync {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, used by the server binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
