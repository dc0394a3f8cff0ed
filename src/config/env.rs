//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "ISOTEST";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Colored output from ISOTEST_COLOR
    pub color: Option<bool>,
    /// Log policy from ISOTEST_LOGS
    pub logs: Option<String>,
    /// Default execution mode from ISOTEST_MODE
    pub mode: Option<String>,
    /// Output format from ISOTEST_FORMAT
    pub format: Option<String>,
    /// Log level from ISOTEST_LOG_LEVEL
    pub log_level: Option<String>,
    /// Config file from ISOTEST_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            color: get_env_bool("COLOR"),
            logs: get_env("LOGS"),
            mode: get_env("MODE"),
            format: get_env("FORMAT"),
            log_level: get_env("LOG_LEVEL"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.color.is_some()
            || self.logs.is_some()
            || self.mode.is_some()
            || self.format.is_some()
            || self.log_level.is_some()
            || self.config_file.is_some()
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables (useful for testing)
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn color(mut self, color: bool) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_COLOR"), color.to_string()));
        self
    }

    pub fn logs(mut self, policy: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_LOGS"), policy.into()));
        self
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_MODE"), mode.into()));
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_FORMAT"), format.into()));
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_LOG_LEVEL"), level.into()));
        self
    }

    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_CONFIG"), path.into()));
        self
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all ISOTEST environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_COLOR       Color outcome labels (true/false)");
    println!("  {ENV_PREFIX}_LOGS        Captured output policy (on-failure, always, never)");
    println!("  {ENV_PREFIX}_MODE        Default block mode (parallel, sequential)");
    println!("  {ENV_PREFIX}_FORMAT      Summary format (tree, json, json-pretty, csv)");
    println!("  {ENV_PREFIX}_LOG_LEVEL   Harness log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_CONFIG      Path to configuration file");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_LOGS=always");
    println!("  isotest run --sequential");
}
