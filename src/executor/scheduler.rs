//! Block scheduling
//!
//! Walks the block tree depth-first. A block's own tests run first, either
//! all at once or one at a time depending on its mode, and only then are
//! its child blocks visited in insertion order.

use nix::poll::{PollFd, PollFlags};
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::collections::HashMap;
use std::io::Write;
use tracing::{debug, info};

use super::isolation::{self, SpawnedTest};
use crate::config::HarnessConfig;
use crate::errors::{HarnessError, Result};
use crate::models::{BlockId, ExecutionMode, Outcome, Suite};
use crate::output::outcome_label;
use crate::results::RunStats;
use crate::utils::timed;

const INDENT: &str = "    ";

/// Runs blocks of a suite, recording outcomes and writing failure reports
pub struct Scheduler<'a, W: Write> {
    suite: &'a mut Suite,
    stats: &'a mut RunStats,
    out: &'a mut W,
    config: &'a HarnessConfig,
}

impl<'a, W: Write> Scheduler<'a, W> {
    pub fn new(
        suite: &'a mut Suite,
        stats: &'a mut RunStats,
        out: &'a mut W,
        config: &'a HarnessConfig,
    ) -> Self {
        Self {
            suite,
            stats,
            out,
            config,
        }
    }

    /// Run the tests of `id`, then every descendant block
    pub fn run(&mut self, id: BlockId) -> Result<()> {
        let block = self.suite.block(id);
        if !block.tests.is_empty() {
            info!(
                block = %block.name,
                tests = block.tests.len(),
                mode = %block.mode,
                "running block"
            );
        }

        let mode = block.mode;
        match mode {
            ExecutionMode::Parallel => self.run_parallel(id)?,
            ExecutionMode::Sequential => self.run_sequential(id)?,
        }

        let block = self.suite.block_mut(id);
        block.success = block
            .tests
            .iter()
            .all(|t| t.outcome() == Some(Outcome::Success));

        let children = block.children.clone();
        for child in children {
            let name = self.suite.block(child).name.clone();
            let (result, duration) = timed(name, || self.run(child));
            result?;
            self.suite.block_mut(child).duration = duration;
        }

        Ok(())
    }

    fn run_sequential(&mut self, id: BlockId) -> Result<()> {
        for index in 0..self.suite.block(id).tests.len() {
            let mut spawned = isolation::spawn(&self.suite.block(id).tests[index])?;
            spawned.drain()?;
            let status = isolation::wait_for(spawned.pid())?;
            self.complete(id, index, spawned, status)?;
        }
        Ok(())
    }

    fn run_parallel(&mut self, id: BlockId) -> Result<()> {
        let mut pending: HashMap<Pid, (usize, SpawnedTest)> = HashMap::new();
        for (index, test) in self.suite.block(id).tests.iter().enumerate() {
            let spawned = isolation::spawn(test)?;
            pending.insert(spawned.pid(), (index, spawned));
        }
        debug!(count = pending.len(), "all tests of block spawned");

        while !pending.is_empty() {
            // A closed pipe means the child is exiting; reap it right away.
            for pid in read_ready_output(&mut pending)? {
                if let Some((index, spawned)) = pending.remove(&pid) {
                    let status = isolation::wait_for(pid)?;
                    self.complete(id, index, spawned, status)?;
                }
            }
        }
        Ok(())
    }

    /// Finish a reaped test: report it, apply the log policy and record it
    fn complete(
        &mut self,
        id: BlockId,
        index: usize,
        spawned: SpawnedTest,
        status: WaitStatus,
    ) -> Result<()> {
        let mut record = spawned.finish(status, self.suite.block(id).tests[index].name())?;
        let policy = self.config.log_policy;
        let keep_log = policy.keeps_log(record.outcome);

        if policy.reports(record.outcome) {
            let test = &self.suite.block(id).tests[index];
            for (depth, name) in self.suite.ancestry(id).into_iter().enumerate() {
                writeln!(self.out, "{}in block '{}'", INDENT.repeat(depth), name)
                    .map_err(HarnessError::io("write report"))?;
            }
            writeln!(
                self.out,
                "{}: {}",
                test,
                outcome_label(record.outcome, self.config.colorize)
            )
            .map_err(HarnessError::io("write report"))?;
            for line in &record.diagnostics {
                writeln!(self.out, "{line}").map_err(HarnessError::io("write report"))?;
            }
            if keep_log {
                writeln!(self.out, "LOGS:").map_err(HarnessError::io("write report"))?;
                self.out
                    .write_all(&record.log)
                    .map_err(HarnessError::io("write report"))?;
            }
            writeln!(self.out).map_err(HarnessError::io("write report"))?;
            self.out.flush().map_err(HarnessError::io("flush report"))?;
        }

        if !keep_log {
            record.log.clear();
        }

        self.stats.record(record.outcome);
        self.suite.block_mut(id).tests[index].set_record(record);
        Ok(())
    }
}

/// Wait until some pending test has output or hung up, then read from each ready one
///
/// Returns the pids whose output reached end-of-stream.
fn read_ready_output(pending: &mut HashMap<Pid, (usize, SpawnedTest)>) -> Result<Vec<Pid>> {
    let ready: Vec<Pid> = {
        let (pids, mut fds): (Vec<Pid>, Vec<PollFd<'_>>) = pending
            .iter()
            .filter_map(|(&pid, (_, spawned))| {
                spawned
                    .output_fd()
                    .map(|fd| (pid, PollFd::new(fd, PollFlags::POLLIN)))
            })
            .unzip();
        isolation::wait_readable(&mut fds)?;
        pids.into_iter()
            .zip(&fds)
            .filter(|(_, fd)| fd.revents().is_some_and(|events| !events.is_empty()))
            .map(|(pid, _)| pid)
            .collect()
    };

    let mut closed = Vec::new();
    for pid in ready {
        if let Some((_, spawned)) = pending.get_mut(&pid) {
            spawned.read_chunk()?;
            if spawned.output_closed() {
                closed.push(pid);
            }
        }
    }
    Ok(closed)
}
