//! Injectable wall-clock source.
//!
//! Batch timestamps and report names are taken from a [`Clock`] handed to
//! each component at construction, so tests can pin time with
//! [`FixedClock`].

use chrono::{Local, NaiveDateTime};

/// Format used for human-facing timestamps (report header, logs).
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Parse `"%Y-%m-%d %H:%M:%S"`; returns `None` on malformed input.
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s, DISPLAY_FORMAT).ok().map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_returns_same_instant() {
        let clock = FixedClock::parse("2026-02-23 10:00:00").unwrap();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().format(DISPLAY_FORMAT).to_string(), "2026-02-23 10:00:00");
    }

    #[test]
    fn test_fixed_clock_rejects_bad_input() {
        assert!(FixedClock::parse("yesterday").is_none());
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
