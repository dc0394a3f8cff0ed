//! Timer utilities
//!
//! Wall-clock measurement for tests and blocks.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Measures elapsed time from a start point
///
/// Pairs a monotonic [`Instant`] for durations with a wall-clock timestamp
/// for reports.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    started_at: DateTime<Utc>,
    label: String,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            started_at: Utc::now(),
            label: label.into(),
        }
    }

    /// Wall-clock time the timer was started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Stop timer and return elapsed time
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!("{}: {}ms", self.label, elapsed.as_millis());
        elapsed
    }
}

/// Run `f` and return its result with the time it took
pub fn timed<T>(label: impl Into<String>, f: impl FnOnce() -> T) -> (T, Duration) {
    let timer = Timer::start(label);
    let value = f();
    (value, timer.stop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timer() {
        let timer = Timer::start("test");
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10);
        assert_eq!(timer.label(), "test");
        assert!(timer.started_at() <= Utc::now());
    }

    #[test]
    fn test_timed() {
        let (value, elapsed) = timed("sleep", || {
            sleep(Duration::from_millis(5));
            7
        });
        assert_eq!(value, 7);
        assert!(elapsed >= Duration::from_millis(5));
    }
}
