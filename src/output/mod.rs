//! Output formatting module
//!
//! Provides the tree, JSON and CSV renderings of a run.

mod formatter;

pub use formatter::{outcome_label, write_report_to_file, OutputFormat, ResultFormatter};
