//! Data models for the harness
//!
//! Outcomes, test cases and the block tree.

mod outcome;
mod suite;

pub use outcome::Outcome;
pub use suite::{Block, BlockId, ExecutionMode, Suite, TestCase, TestFn, TestRecord};
