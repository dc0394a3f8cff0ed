//! isotest - process-isolated hierarchical test harness
//!
//! Tests are registered into nested blocks and each one runs in its own
//! forked process, so a crash, abort or stray exit in one test cannot take
//! down the harness or its neighbours.
//!
//! ## Features
//!
//! - Nested blocks, each running its own tests in parallel or sequentially
//! - Outcomes carried through the process exit status
//! - Captured stdout/stderr printed for failing tests
//! - Summary as an indented tree, JSON or CSV
//!
//! ## Usage
//!
//! ```no_run
//! use isotest::{ExecutionMode, Harness, Outcome};
//!
//! let mut harness = Harness::new();
//! harness.begin_block_with_mode("math", ExecutionMode::Sequential)?;
//! harness.add_test("addition", || Outcome::from(2 + 2 == 4))?;
//! harness.end_block()?;
//!
//! harness.run_tests()?;
//! harness.print_summary()?;
//! std::process::exit(if harness.all_tests_passed() { 0 } else { 1 });
//! # Ok::<(), isotest::HarnessError>(())
//! ```

pub mod config;
pub mod errors;
pub mod executor;
pub mod harness;
pub mod models;
pub mod output;
pub mod results;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use config::{HarnessConfig, LogPolicy};
pub use errors::{HarnessError, Result};
pub use harness::{Harness, RunState};
pub use models::{BlockId, ExecutionMode, Outcome, Suite};
pub use output::{OutputFormat, ResultFormatter};
pub use results::{RunReport, RunStats};
