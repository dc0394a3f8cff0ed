//! Run statistics
//!
//! Counters over every test executed in one run of the block tree.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Outcome;

/// Per-outcome counters for a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub errors: usize,
    pub bad_returns: usize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one completed test
    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Success => self.successes += 1,
            Outcome::Failure => self.failures += 1,
            Outcome::Error => self.errors += 1,
            Outcome::CrashOrBadReturn => self.bad_returns += 1,
        }
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Success => self.successes,
            Outcome::Failure => self.failures,
            Outcome::Error => self.errors,
            Outcome::CrashOrBadReturn => self.bad_returns,
        }
    }

    /// True iff no test produced anything but success
    pub fn all_passed(&self) -> bool {
        self.successes == self.total
    }

    pub fn not_passed(&self) -> usize {
        self.total - self.successes
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.successes as f64 / self.total as f64) * 100.0
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Success: {} | Failure: {} | Error: {} | Bad return: {}",
            self.total, self.successes, self.failures, self.errors, self.bad_returns
        )
    }
}
