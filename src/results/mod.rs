//! Run results
//!
//! Statistics and the report snapshot built after a run.

mod report;
mod stats;

pub use report::{BlockReport, RunReport, TestReport};
pub use stats::RunStats;
