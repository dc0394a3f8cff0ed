//! Helpers shared by unit tests

use std::sync::{Mutex, MutexGuard};

static FORK_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that fork and reap child processes
///
/// A child forked on one libtest thread inherits the capture pipes of tests
/// running on the others and would keep them open, so forking tests must
/// not overlap.
pub fn fork_lock() -> MutexGuard<'static, ()> {
    FORK_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
