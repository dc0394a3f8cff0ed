//! Process isolation
//!
//! Runs a single test case in a forked child process. The child's stdout
//! and stderr are redirected into a pipe and its exit status carries the
//! [`Outcome`] ordinal back to the harness.
//!
//! The pipe has to be read while the child is alive: a child writing more
//! than the pipe capacity blocks until the harness reads.

use chrono::Utc;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollTimeout};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2_stderr, dup2_stdout, fork, pipe, ForkResult, Pid};
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::errors::{HarnessError, Result};
use crate::models::{Outcome, TestCase, TestRecord};
use crate::utils::Timer;

const READ_CHUNK: usize = 8192;

/// A test process that has been started but not yet reaped
#[derive(Debug)]
pub struct SpawnedTest {
    pid: Pid,
    /// Read end of the capture pipe; `None` once end-of-stream was seen
    reader: Option<File>,
    log: Vec<u8>,
    timer: Timer,
}

/// Outcome decoded from a wait status, with any diagnostics it produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    pub diagnostics: Vec<String>,
}

/// Fork a process running `test`
///
/// Returns in the parent only. The child runs the work function and exits
/// with the outcome's exit code.
pub fn spawn(test: &TestCase) -> Result<SpawnedTest> {
    let (read_end, write_end) = pipe().map_err(HarnessError::os("pipe"))?;

    // Anything still buffered would otherwise be written again by the child.
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    // SAFETY: the child only redirects descriptors, runs the test and exits;
    // it never returns into the harness.
    match unsafe { fork() }.map_err(HarnessError::os("fork"))? {
        ForkResult::Child => {
            drop(read_end);
            run_child(test, write_end)
        }
        ForkResult::Parent { child } => {
            drop(write_end);
            let timer = Timer::start(test.name());
            debug!(pid = child.as_raw(), test = test.name(), "spawned test process");
            Ok(SpawnedTest {
                pid: child,
                reader: Some(File::from(read_end)),
                log: Vec::new(),
                timer,
            })
        }
    }
}

fn run_child(test: &TestCase, write_end: OwnedFd) -> ! {
    let redirected = dup2_stdout(&write_end).and_then(|_| dup2_stderr(&write_end));
    drop(write_end);
    if redirected.is_err() {
        exit_child(Outcome::CrashOrBadReturn.exit_code());
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| test.invoke()))
        .unwrap_or(Outcome::CrashOrBadReturn);

    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    exit_child(outcome.exit_code())
}

/// Leave the child without running the exit handlers inherited from the harness
fn exit_child(code: i32) -> ! {
    // SAFETY: `_exit` is async-signal-safe and never returns.
    unsafe { libc::_exit(code) }
}

impl SpawnedTest {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Read end of the capture pipe, while it is still open
    pub fn output_fd(&self) -> Option<BorrowedFd<'_>> {
        self.reader.as_ref().map(|reader| reader.as_fd())
    }

    /// True once the child's output reached end-of-stream
    pub fn output_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Read one chunk of captured output
    ///
    /// Only blocks when nothing is buffered in the pipe; call it after `poll`
    /// reported the descriptor ready. Returns 0 at end-of-stream.
    pub fn read_chunk(&mut self) -> Result<usize> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    self.reader = None;
                    return Ok(0);
                }
                Ok(n) => {
                    self.log.extend_from_slice(&buf[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HarnessError::io("read test output")(e)),
            }
        }
    }

    /// Read captured output until end-of-stream
    pub fn drain(&mut self) -> Result<()> {
        if let Some(mut reader) = self.reader.take() {
            reader
                .read_to_end(&mut self.log)
                .map_err(HarnessError::io("read test output"))?;
        }
        Ok(())
    }

    /// Turn a reaped child's status into a record
    ///
    /// Takes the elapsed time, classifies `status` and reads whatever output
    /// is left in the pipe.
    pub fn finish(mut self, status: WaitStatus, name: &str) -> Result<TestRecord> {
        let finished_at = Utc::now();
        let started_at = self.timer.started_at();
        let duration = self.timer.elapsed();
        self.drain()?;

        let Classification {
            outcome,
            diagnostics,
        } = classify(status, self.pid, name);
        for line in &diagnostics {
            warn!("{line}");
        }

        debug!(
            pid = self.pid.as_raw(),
            test = name,
            outcome = %outcome,
            bytes = self.log.len(),
            elapsed_ms = duration.as_millis() as u64,
            "reaped test process"
        );

        Ok(TestRecord {
            started_at,
            finished_at,
            duration,
            outcome,
            pid: self.pid.as_raw(),
            log: self.log,
            diagnostics,
        })
    }
}

/// Decode how a test process terminated
pub fn classify(status: WaitStatus, pid: Pid, name: &str) -> Classification {
    let mut diagnostics = Vec::new();
    let outcome = match status {
        WaitStatus::Exited(_, code) => match Outcome::from_exit_code(code) {
            Some(outcome) => outcome,
            None => {
                diagnostics.push(format!(
                    "Child '{pid}'({name}) exited with code '{code}'"
                ));
                Outcome::CrashOrBadReturn
            }
        },
        WaitStatus::Signaled(_, signal, core_dumped) => {
            diagnostics.push(format!(
                "Child '{pid}'({name}) terminated by signal '{}'",
                signal.as_str()
            ));
            if core_dumped {
                diagnostics.push(format!("Child '{pid}'({name}) produced a core dump"));
            }
            Outcome::CrashOrBadReturn
        }
        other => {
            diagnostics.push(format!(
                "Child '{pid}'({name}) returned an invalid status: {other:?}"
            ));
            Outcome::CrashOrBadReturn
        }
    };

    Classification {
        outcome,
        diagnostics,
    }
}

/// Block until `pid` terminates
pub fn wait_for(pid: Pid) -> Result<WaitStatus> {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            other => return other.map_err(HarnessError::os("waitpid")),
        }
    }
}

/// Block until at least one of `fds` is readable or hung up
pub fn wait_readable(fds: &mut [PollFd<'_>]) -> Result<()> {
    loop {
        match poll(fds, PollTimeout::NONE) {
            Err(Errno::EINTR) => continue,
            other => return other.map(drop).map_err(HarnessError::os("poll")),
        }
    }
}

/// Run `test` in its own process and wait for it
pub fn run_isolated(test: &TestCase) -> Result<TestRecord> {
    let mut spawned = spawn(test)?;
    spawned.drain()?;
    let status = wait_for(spawned.pid())?;
    spawned.finish(status, test.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExecutionMode, Suite, TestFn};
    use crate::test_support::fork_lock;
    use nix::sys::signal::Signal;

    fn single(name: &str, work: TestFn) -> Suite {
        let mut suite = Suite::new();
        let block = suite.add_block(suite.root(), "isolation", ExecutionMode::Sequential);
        suite.add_test(block, name, work);
        suite
    }

    fn run_single(name: &str, work: TestFn) -> TestRecord {
        let suite = single(name, work);
        let block = suite.find("isolation").unwrap();
        run_isolated(&suite.block(block).tests[0]).unwrap()
    }

    #[test]
    fn test_classify_exit_codes() {
        let pid = Pid::from_raw(4242);
        for outcome in Outcome::ALL {
            let status = WaitStatus::Exited(pid, outcome.exit_code());
            let classification = classify(status, pid, "t");
            assert_eq!(classification.outcome, outcome);
            assert!(classification.diagnostics.is_empty());
        }
    }

    #[test]
    fn test_classify_out_of_range_exit() {
        let pid = Pid::from_raw(4242);
        let classification = classify(WaitStatus::Exited(pid, Outcome::COUNT), pid, "math");
        assert_eq!(classification.outcome, Outcome::CrashOrBadReturn);
        assert_eq!(
            classification.diagnostics,
            vec!["Child '4242'(math) exited with code '4'".to_string()]
        );
    }

    #[test]
    fn test_classify_signal_and_core_dump() {
        let pid = Pid::from_raw(7);
        let classification = classify(WaitStatus::Signaled(pid, Signal::SIGSEGV, true), pid, "io");
        assert_eq!(classification.outcome, Outcome::CrashOrBadReturn);
        assert_eq!(classification.diagnostics.len(), 2);
        assert!(classification.diagnostics[0].contains("SIGSEGV"));
        assert!(classification.diagnostics[1].contains("core dump"));
    }

    #[test]
    fn test_classify_unexpected_status() {
        let pid = Pid::from_raw(9);
        let classification = classify(WaitStatus::Continued(pid), pid, "odd");
        assert_eq!(classification.outcome, Outcome::CrashOrBadReturn);
        assert!(classification.diagnostics[0].contains("invalid status"));
    }

    #[test]
    fn test_run_isolated_success_captures_output() {
        let _guard = fork_lock();
        let record = run_single(
            "hello",
            Box::new(|| {
                let _ = writeln!(io::stdout(), "to stdout");
                let _ = writeln!(io::stderr(), "to stderr");
                Outcome::Success
            }),
        );
        assert_eq!(record.outcome, Outcome::Success);
        let log = String::from_utf8_lossy(&record.log);
        assert!(log.contains("to stdout"));
        assert!(log.contains("to stderr"));
        assert_ne!(record.pid, std::process::id() as i32);
        assert!(record.finished_at >= record.started_at);
    }

    #[test]
    fn test_run_isolated_reports_each_outcome() {
        let _guard = fork_lock();
        for outcome in Outcome::ALL {
            let record = run_single("returns", Box::new(move || outcome));
            assert_eq!(record.outcome, outcome);
            assert!(record.diagnostics.is_empty());
        }
    }

    #[test]
    fn test_abort_is_classified_as_crash() {
        let _guard = fork_lock();
        let record = run_single("abort", Box::new(|| -> Outcome { std::process::abort() }));
        assert_eq!(record.outcome, Outcome::CrashOrBadReturn);
        assert!(record.diagnostics[0].contains("SIGABRT"));
    }

    #[test]
    fn test_bad_exit_code_is_classified_as_crash() {
        let _guard = fork_lock();
        let record = run_single("exit 42", Box::new(|| -> Outcome { std::process::exit(42) }));
        assert_eq!(record.outcome, Outcome::CrashOrBadReturn);
        assert!(record.diagnostics[0].contains("'42'"));
    }

    #[test]
    fn test_panic_is_classified_as_crash() {
        let _guard = fork_lock();
        let record = run_single("panics", Box::new(|| -> Outcome { panic!("boom") }));
        assert_eq!(record.outcome, Outcome::CrashOrBadReturn);
        assert!(record.diagnostics.is_empty());
    }

    #[test]
    fn test_child_memory_is_isolated() {
        use std::cell::Cell;
        use std::rc::Rc;

        let _guard = fork_lock();
        let counter = Rc::new(Cell::new(0));
        let in_child = counter.clone();
        let record = run_single(
            "mutates",
            Box::new(move || {
                in_child.set(in_child.get() + 1);
                Outcome::from(in_child.get() == 1)
            }),
        );
        assert_eq!(record.outcome, Outcome::Success);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_output_larger_than_pipe_is_captured() {
        let _guard = fork_lock();
        let record = run_single(
            "big log",
            Box::new(|| {
                let _ = io::stdout().write_all(&vec![b'x'; 200_000]);
                Outcome::Failure
            }),
        );
        assert_eq!(record.outcome, Outcome::Failure);
        assert_eq!(record.log.len(), 200_000);
        assert!(record.log.iter().all(|&b| b == b'x'));
    }

    #[test]
    fn test_read_chunk_until_end_of_stream() {
        let _guard = fork_lock();
        let suite = single(
            "chunks",
            Box::new(|| {
                let _ = io::stdout().write_all(&[b'y'; 3 * READ_CHUNK]);
                Outcome::Success
            }),
        );
        let block = suite.find("isolation").unwrap();
        let mut spawned = spawn(&suite.block(block).tests[0]).unwrap();

        let mut total = 0;
        while !spawned.output_closed() {
            total += spawned.read_chunk().unwrap();
        }
        assert_eq!(total, 3 * READ_CHUNK);
        assert!(spawned.output_fd().is_none());

        let status = wait_for(spawned.pid()).unwrap();
        let record = spawned.finish(status, "chunks").unwrap();
        assert_eq!(record.outcome, Outcome::Success);
        assert_eq!(record.log.len(), 3 * READ_CHUNK);
    }
}
