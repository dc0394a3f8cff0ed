//! Harness error types
//!
//! Usage errors and operating-system failures. Test outcomes are never
//! errors; see [`crate::models::Outcome`].

use nix::errno::Errno;
use thiserror::Error;

/// Errors returned by the harness API
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("There is no block to close")]
    NoBlockToClose,

    #[error("Can't register a test outside of a block")]
    NoOpenBlock,

    #[error("Can't change the suite while tests are running")]
    RunInProgress,

    #[error("Tests already ran")]
    AlreadyRan,

    #[error("{operation} failed: {source}")]
    Os {
        operation: &'static str,
        #[source]
        source: Errno,
    },

    #[error("{operation} failed: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render report: {0}")]
    Render(String),
}

impl HarnessError {
    pub(crate) fn os(operation: &'static str) -> impl FnOnce(Errno) -> Self {
        move |source| HarnessError::Os { operation, source }
    }

    pub(crate) fn io(operation: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| HarnessError::Io { operation, source }
    }

    /// True for errors caused by misuse of the registration API
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            HarnessError::NoBlockToClose
                | HarnessError::NoOpenBlock
                | HarnessError::RunInProgress
                | HarnessError::AlreadyRan
        )
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
