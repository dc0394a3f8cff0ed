//! Harness logging
//!
//! `tracing` subscriber setup for the harness's own diagnostics.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// `EnvFilter` directive restricting output to this crate
    pub fn directive(self) -> String {
        format!("isotest={}", self.to_tracing_level())
    }
}

/// Initialize the logger with specified level
///
/// Log lines go to stderr so they never mix with the report on stdout.
/// Inside a test process stderr is the capture pipe, so anything a test
/// logs through `tracing` ends up in its captured output.
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::new(level.directive());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
