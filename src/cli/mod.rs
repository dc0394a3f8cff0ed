//! CLI argument parsing
//!
//! Defines command-line interface using clap.

pub mod demo;

use clap::{Parser, Subcommand};

/// Process-isolated hierarchical test harness
#[derive(Parser, Debug)]
#[command(name = "isotest")]
#[command(author = "hephaex@gmail.com")]
#[command(version)]
#[command(about = "Run nested test blocks with one process per test")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the built-in demo suite
    Run(RunArgs),

    /// Show supported environment variables
    Env,

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Summary format (tree, json, json-pretty, csv)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Disable colored outcome labels
    #[arg(long)]
    pub no_color: bool,

    /// Captured output policy (on-failure, always, never)
    #[arg(short, long)]
    pub logs: Option<String>,

    /// Run every block sequentially
    #[arg(short, long)]
    pub sequential: bool,

    /// Include a block of deliberately crashing tests
    #[arg(long)]
    pub with_crash: bool,

    /// Also write the summary to this file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "./isotest.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file (default: first one found)
        file: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let args = Args::parse_from([
            "isotest",
            "run",
            "--format",
            "csv",
            "--no-color",
            "--logs",
            "always",
            "--sequential",
            "--with-crash",
        ]);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.format.as_deref(), Some("csv"));
                assert!(run.no_color);
                assert_eq!(run.logs.as_deref(), Some("always"));
                assert!(run.sequential);
                assert!(run.with_crash);
                assert!(run.output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_init_defaults() {
        let args = Args::parse_from(["isotest", "config", "init"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { output, force },
            }) => {
                assert_eq!(output, "./isotest.yaml");
                assert!(!force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
