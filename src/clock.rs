//! Time source used for token expiry checks

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Expiry is only ever detected lazily, by comparing a token's expiry against
/// `now()` when a token is requested. Tests substitute a manual clock to move
/// time past an expiry without sleeping.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
