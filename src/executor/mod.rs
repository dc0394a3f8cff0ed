//! Test execution engine
//!
//! Provides per-test process isolation and the block scheduler.

pub mod isolation;
mod scheduler;

pub use isolation::{run_isolated, SpawnedTest};
pub use scheduler::Scheduler;
