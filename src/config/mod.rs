//! Configuration module
//!
//! Handles loading and managing harness configuration. Values come from a
//! YAML or JSON file, then environment overrides (see [`env`]).

pub mod env;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::models::{ExecutionMode, Outcome};
use crate::output::OutputFormat;
use crate::utils::LogLevel;

pub use env::{print_env_help, EnvBuilder, EnvConfig, EnvGuard};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./isotest.yaml",
    "./isotest.yml",
    "./.isotest.yaml",
    "~/.config/isotest/config.yaml",
];

/// When captured test output is printed and kept
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogPolicy {
    /// Print and keep logs of tests that did not succeed
    #[default]
    OnFailure,
    /// Print and keep logs of every test
    Always,
    /// Never print or keep logs
    Never,
}

impl LogPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "on-failure" | "on_failure" | "failure" | "failures" => Some(LogPolicy::OnFailure),
            "always" | "all" => Some(LogPolicy::Always),
            "never" | "none" | "off" => Some(LogPolicy::Never),
            _ => None,
        }
    }

    /// Whether a test with this outcome gets a report block during the run
    pub fn reports(self, outcome: Outcome) -> bool {
        !outcome.is_success() || self == LogPolicy::Always
    }

    /// Whether captured bytes of a test with this outcome are printed and kept
    pub fn keeps_log(self, outcome: Outcome) -> bool {
        match self {
            LogPolicy::OnFailure => !outcome.is_success(),
            LogPolicy::Always => true,
            LogPolicy::Never => false,
        }
    }
}

impl fmt::Display for LogPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogPolicy::OnFailure => write!(f, "on-failure"),
            LogPolicy::Always => write!(f, "always"),
            LogPolicy::Never => write!(f, "never"),
        }
    }
}

/// Harness configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Color outcome labels in reports
    pub colorize: bool,

    /// Captured output handling
    pub log_policy: LogPolicy,

    /// Mode used by blocks opened without an explicit one
    pub default_mode: ExecutionMode,

    /// Summary format
    pub format: OutputFormat,

    /// Harness log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            colorize: true,
            log_policy: LogPolicy::OnFailure,
            default_mode: ExecutionMode::Parallel,
            format: OutputFormat::Tree,
            log_level: "info".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if LogLevel::from_str(&self.log_level).is_none() {
            anyhow::bail!(
                "Invalid log level '{}'. Valid values: trace, debug, info, warn, error",
                self.log_level
            );
        }
        Ok(())
    }

    /// Apply environment overrides on top of this configuration
    pub fn apply_env(&mut self, env: &EnvConfig) -> Result<()> {
        if let Some(colorize) = env.color {
            self.colorize = colorize;
        }
        if let Some(logs) = &env.logs {
            self.log_policy = LogPolicy::from_str(logs)
                .with_context(|| format!("Invalid log policy in environment: {logs}"))?;
        }
        if let Some(mode) = &env.mode {
            self.default_mode = ExecutionMode::from_str(mode)
                .with_context(|| format!("Invalid execution mode in environment: {mode}"))?;
        }
        if let Some(format) = &env.format {
            self.format = OutputFormat::from_str(format)
                .with_context(|| format!("Invalid output format in environment: {format}"))?;
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
        self.validate()
    }

    /// Parsed log level, falling back to info
    pub fn level(&self) -> LogLevel {
        LogLevel::from_str(&self.log_level).unwrap_or(LogLevel::Info)
    }

    /// Generate example configuration
    pub fn example() -> Self {
        Self {
            colorize: true,
            log_policy: LogPolicy::OnFailure,
            default_mode: ExecutionMode::Sequential,
            format: OutputFormat::Tree,
            log_level: "warn".to_string(),
        }
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
