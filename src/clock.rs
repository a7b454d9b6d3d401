//! Timestamp source for log lines.
//!
//! The log does not read the system clock directly; it goes through a
//! [`Clock`] so tests can pin the timestamp and assert on exact lines.

use chrono::Local;

/// Produces the timestamp placed between the brackets of a log line.
pub trait Clock: Send + Sync {
    fn now(&self) -> String;
}

/// Wall-clock time formatted as `YYYY-MM-DD HH:MM:SS` in local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// A clock that always returns the same string. Test use only in spirit, but
/// lives here so integration tests and benches can reach it.
#[derive(Clone, Debug)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.0.clone()
    }
}
