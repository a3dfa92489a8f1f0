//! Injectable time source.
//!
//! Circulation date arithmetic (due dates, overdue detection, fines) always
//! goes through a [`Clock`] so tests can pin `now`.

use chrono::{DateTime, Utc};

#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, used everywhere outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mock_clock_returns_pinned_instant() {
        let pinned = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut clock = MockClock::new();
        clock.expect_now().return_const(pinned);

        assert_eq!(clock.now(), pinned);
    }
}
