//! Harness facade
//!
//! Registration of blocks and tests, the run itself, and the summary.

use chrono::{DateTime, Utc};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{error, info};

use crate::config::HarnessConfig;
use crate::errors::{HarnessError, Result};
use crate::executor::Scheduler;
use crate::models::{BlockId, ExecutionMode, Outcome, Suite};
use crate::output::ResultFormatter;
use crate::results::{RunReport, RunStats};
use crate::utils::Timer;

/// Lifecycle of a harness
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Registering,
    Running,
    Finished,
}

/// Collects blocks and tests, runs them once, then reports
pub struct Harness {
    suite: Suite,
    current: BlockId,
    state: RunState,
    stats: RunStats,
    config: HarnessConfig,
    started_at: Option<DateTime<Utc>>,
    total_duration: Duration,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(HarnessConfig::default())
    }

    pub fn with_config(config: HarnessConfig) -> Self {
        let suite = Suite::new();
        let current = suite.root();
        Self {
            suite,
            current,
            state: RunState::Registering,
            stats: RunStats::new(),
            config,
            started_at: None,
            total_duration: Duration::ZERO,
        }
    }

    fn ensure_registering(&self) -> Result<()> {
        match self.state {
            RunState::Registering => Ok(()),
            RunState::Running => Err(HarnessError::RunInProgress),
            RunState::Finished => Err(HarnessError::AlreadyRan),
        }
    }

    /// Register a test in the currently open block
    pub fn add_test<F>(&mut self, name: impl Into<String>, work: F) -> Result<()>
    where
        F: Fn() -> Outcome + 'static,
    {
        self.ensure_registering()?;
        if self.current == self.suite.root() {
            return Err(HarnessError::NoOpenBlock);
        }
        self.suite.add_test(self.current, name, Box::new(work));
        Ok(())
    }

    /// Open a child block of the current block with the configured default mode
    pub fn begin_block(&mut self, name: impl Into<String>) -> Result<BlockId> {
        self.begin_block_with_mode(name, self.config.default_mode)
    }

    pub fn begin_block_with_mode(
        &mut self,
        name: impl Into<String>,
        mode: ExecutionMode,
    ) -> Result<BlockId> {
        self.ensure_registering()?;
        let id = self.suite.add_block(self.current, name, mode);
        self.current = id;
        Ok(id)
    }

    /// Close the current block and return to its parent
    pub fn end_block(&mut self) -> Result<()> {
        self.ensure_registering()?;
        match self.suite.parent(self.current) {
            Some(parent) => {
                self.current = parent;
                Ok(())
            }
            None => Err(HarnessError::NoBlockToClose),
        }
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    /// Number of blocks currently open
    pub fn depth(&self) -> usize {
        self.suite.ancestry(self.current).len()
    }

    /// Run every registered test, writing failure reports to stdout
    pub fn run_tests(&mut self) -> Result<bool> {
        self.run_tests_to(&mut io::stdout())
    }

    /// Run every registered test, writing failure reports to `out`
    ///
    /// Returns whether every test succeeded.
    pub fn run_tests_to<W: Write>(&mut self, out: &mut W) -> Result<bool> {
        self.ensure_registering()?;
        self.state = RunState::Running;

        let root = self.suite.root();
        info!(
            blocks = self.suite.len(),
            tests = self.suite.subtree_test_count(root),
            "starting test run"
        );

        let timer = Timer::start("test run");
        self.started_at = Some(timer.started_at());
        let result = Scheduler::new(&mut self.suite, &mut self.stats, out, &self.config).run(root);
        self.total_duration = timer.stop();
        self.suite.block_mut(root).duration = self.total_duration;
        self.state = RunState::Finished;

        if let Err(e) = result {
            error!("test run aborted: {e}");
            return Err(e);
        }

        info!(
            total = self.stats.total,
            passed = self.stats.successes,
            "test run finished in {:.3}s",
            self.total_duration.as_secs_f64()
        );
        Ok(self.all_tests_passed())
    }

    /// True when every completed test succeeded
    pub fn all_tests_passed(&self) -> bool {
        self.stats.all_passed()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Serializable snapshot of the tree and its results
    pub fn report(&self) -> RunReport {
        RunReport::new(&self.suite, self.stats, self.started_at, self.total_duration)
    }

    /// Render the summary in the configured format
    pub fn render_summary(&self) -> Result<String> {
        ResultFormatter::from_config(&self.config).format_run(&self.report())
    }

    /// Print the summary to stdout
    pub fn print_summary(&self) -> Result<()> {
        let summary = self.render_summary()?;
        let mut stdout = io::stdout();
        stdout
            .write_all(summary.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(HarnessError::io("write summary"))
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
