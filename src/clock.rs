//! Injectable wall clock.

use std::sync::Arc;

use chrono::{DateTime, Local};

/// Source of the current local time. Tests substitute a fixed instant.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// The real system clock.
#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(Local::now)
}

/// A clock frozen at `at`.
#[must_use]
pub fn fixed_clock(at: DateTime<Local>) -> Clock {
    Arc::new(move || at)
}
