//! Test outcome model
//!
//! Defines the closed set of results a test can produce and the exit-code
//! contract shared by the harness and its forked test processes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one executed test
///
/// The discriminant is the exit status a test process terminates with.
/// Statuses outside `0..Outcome::COUNT` are never produced by a well-behaved
/// child and are classified as [`Outcome::CrashOrBadReturn`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success = 0,
    Failure = 1,
    Error = 2,
    CrashOrBadReturn = 3,
}

impl Outcome {
    /// Number of real outcomes; valid exit codes are `0..COUNT`
    pub const COUNT: i32 = 4;

    /// All outcomes in ordinal order
    pub const ALL: [Outcome; 4] = [
        Outcome::Success,
        Outcome::Failure,
        Outcome::Error,
        Outcome::CrashOrBadReturn,
    ];

    /// Exit status a test process uses to report this outcome
    pub fn exit_code(self) -> i32 {
        self as i32
    }

    /// Decode a process exit status
    pub fn from_exit_code(code: i32) -> Option<Outcome> {
        match code {
            0 => Some(Outcome::Success),
            1 => Some(Outcome::Failure),
            2 => Some(Outcome::Error),
            3 => Some(Outcome::CrashOrBadReturn),
            _ => None,
        }
    }

    /// Report label
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
            Outcome::Error => "ERROR",
            Outcome::CrashOrBadReturn => "BAD_RETURN",
        }
    }

    /// Width of the widest label, used to align report columns
    pub fn label_width() -> usize {
        Self::ALL.iter().map(|o| o.label().len()).max().unwrap_or(0)
    }

    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl From<bool> for Outcome {
    fn from(passed: bool) -> Self {
        if passed {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
