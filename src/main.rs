//! isotest - process-isolated hierarchical test harness
//!
//! Runs a demo suite through the harness and manages its configuration.
//!
//! ## Usage
//!
//! ```bash
//! # Run the demo suite
//! isotest run
//!
//! # Sequential run with a crashing block, CSV summary
//! isotest run --sequential --with-crash --format csv
//!
//! # Write an example configuration
//! isotest config init
//!
//! # List environment overrides
//! isotest env
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::info;

use isotest::config::{print_env_help, EnvConfig};
use isotest::output::write_report_to_file;
use isotest::utils::{init_logger, LogLevel};
use isotest::{ExecutionMode, Harness, HarnessConfig, LogPolicy, OutputFormat};

mod cli;

use cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        cli::Command::Run(run_args) => {
            let passed = run(run_args, args.verbose)?;
            if !passed {
                std::process::exit(1);
            }
        }
        cli::Command::Env => {
            print_env_help();
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args)?;
        }
    }

    Ok(())
}

/// Resolve configuration: file, then environment, then command line
fn load_config(path: Option<&str>, env: &EnvConfig) -> Result<HarnessConfig> {
    let path = path.or(env.config_file.as_deref());
    let mut config = match path {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::load_default()?,
    };
    config.apply_env(env)?;
    Ok(config)
}

fn run(args: cli::RunArgs, verbose: bool) -> Result<bool> {
    let env = EnvConfig::load();
    let mut config = load_config(args.config.as_deref(), &env)?;

    if let Some(format) = &args.format {
        config.format = OutputFormat::from_str(format)
            .ok_or_else(|| anyhow::anyhow!("Unknown output format: {format}"))?;
    }
    if let Some(logs) = &args.logs {
        config.log_policy = LogPolicy::from_str(logs)
            .ok_or_else(|| anyhow::anyhow!("Unknown log policy: {logs}"))?;
    }
    if args.no_color {
        config.colorize = false;
    }
    if args.sequential {
        config.default_mode = ExecutionMode::Sequential;
    }

    let level = if verbose { LogLevel::Debug } else { config.level() };
    init_logger(level);

    let format = config.format;
    let mut harness = Harness::with_config(config);
    cli::demo::register(&mut harness, args.with_crash)?;

    info!("Running demo suite");
    let passed = harness.run_tests().context("Test run aborted")?;
    harness.print_summary()?;

    if let Some(output) = &args.output {
        write_report_to_file(output, &harness.report(), format)?;
        info!("Summary written to {output}");
    }

    Ok(passed)
}

fn manage_config(args: cli::ConfigArgs) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            HarnessConfig::example().save(path)?;
            println!("✓ Configuration file created: {output}");
        }

        cli::ConfigAction::Show { format } => {
            let config = load_config(None, &EnvConfig::load())?;
            let output = if format == "json" {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_yaml::to_string(&config)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Validate { file } => {
            let path = file.unwrap_or_else(|| {
                HarnessConfig::find()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|| "./isotest.yaml".to_string())
            });

            match HarnessConfig::load(&path) {
                Ok(_) => {
                    println!("✓ Configuration file is valid: {path}");
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e}");
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}
