//! Run report snapshot
//!
//! A serializable view of the block tree after a run, consumed by the
//! output formatters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::RunStats;
use crate::models::{BlockId, ExecutionMode, Outcome, Suite, TestCase};

/// Snapshot of a whole run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: Option<DateTime<Utc>>,
    pub total_duration_secs: f64,
    pub stats: RunStats,
    pub all_passed: bool,
    /// Top-level blocks; the sentinel root is not reported
    pub blocks: Vec<BlockReport>,
}

/// Snapshot of one block and its descendants
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockReport {
    pub name: String,
    pub path: String,
    pub mode: ExecutionMode,
    pub duration_secs: f64,
    pub success: bool,
    pub subtree_success: bool,
    pub tests: Vec<TestReport>,
    pub blocks: Vec<BlockReport>,
}

/// Snapshot of one test case
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestReport {
    pub number: usize,
    pub name: String,
    pub outcome: Option<Outcome>,
    pub duration_secs: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub pid: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl RunReport {
    pub fn new(
        suite: &Suite,
        stats: RunStats,
        started_at: Option<DateTime<Utc>>,
        total_duration: Duration,
    ) -> Self {
        let blocks = suite
            .block(suite.root())
            .children
            .iter()
            .map(|&id| BlockReport::new(suite, id))
            .collect();

        Self {
            started_at,
            total_duration_secs: total_duration.as_secs_f64(),
            stats,
            all_passed: stats.all_passed(),
            blocks,
        }
    }

    /// Every test in depth-first order with the path of its block
    pub fn flatten(&self) -> Vec<(&str, &TestReport)> {
        let mut rows = Vec::new();
        for block in &self.blocks {
            block.collect(&mut rows);
        }
        rows
    }
}

impl BlockReport {
    fn new(suite: &Suite, id: BlockId) -> Self {
        let block = suite.block(id);
        Self {
            name: block.name.clone(),
            path: suite.path(id),
            mode: block.mode,
            duration_secs: block.duration.as_secs_f64(),
            success: block.success,
            subtree_success: suite.subtree_passed(id),
            tests: block.tests.iter().map(TestReport::new).collect(),
            blocks: block
                .children
                .iter()
                .map(|&child| BlockReport::new(suite, child))
                .collect(),
        }
    }

    fn collect<'a>(&'a self, rows: &mut Vec<(&'a str, &'a TestReport)>) {
        rows.extend(self.tests.iter().map(|t| (self.path.as_str(), t)));
        for block in &self.blocks {
            block.collect(rows);
        }
    }
}

impl TestReport {
    fn new(test: &TestCase) -> Self {
        let record = test.record();
        Self {
            number: test.number(),
            name: test.name().to_string(),
            outcome: record.map(|r| r.outcome),
            duration_secs: record.map(|r| r.duration.as_secs_f64()).unwrap_or(0.0),
            started_at: record.map(|r| r.started_at),
            pid: record.map(|r| r.pid),
            diagnostics: record.map(|r| r.diagnostics.clone()).unwrap_or_default(),
            log: record
                .filter(|r| !r.log.is_empty())
                .map(|r| String::from_utf8_lossy(&r.log).into_owned()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.map(Outcome::is_success).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestRecord;

    fn sample_suite() -> Suite {
        let mut suite = Suite::new();
        let outer = suite.add_block(suite.root(), "outer", ExecutionMode::Parallel);
        let inner = suite.add_block(outer, "inner", ExecutionMode::Sequential);
        suite.add_test(inner, "ok", Box::new(|| Outcome::Success));
        suite.add_test(inner, "broken", Box::new(|| Outcome::Failure));

        let now = Utc::now();
        let tests = &mut suite.block_mut(inner).tests;
        tests[0].set_record(TestRecord {
            started_at: now,
            finished_at: now,
            duration: Duration::from_millis(5),
            outcome: Outcome::Success,
            pid: 100,
            log: Vec::new(),
            diagnostics: Vec::new(),
        });
        tests[1].set_record(TestRecord {
            started_at: now,
            finished_at: now,
            duration: Duration::from_millis(7),
            outcome: Outcome::Failure,
            pid: 101,
            log: b"expected 4, got 5\n".to_vec(),
            diagnostics: Vec::new(),
        });
        suite.block_mut(inner).success = false;
        suite
    }

    #[test]
    fn test_report_mirrors_tree() {
        let suite = sample_suite();
        let mut stats = RunStats::new();
        stats.record(Outcome::Success);
        stats.record(Outcome::Failure);

        let report = RunReport::new(&suite, stats, None, Duration::from_millis(20));
        assert_eq!(report.blocks.len(), 1);
        assert!(!report.all_passed);

        let outer = &report.blocks[0];
        assert_eq!(outer.name, "outer");
        assert!(outer.success);
        assert!(!outer.subtree_success);
        assert!(outer.tests.is_empty());

        let inner = &outer.blocks[0];
        assert_eq!(inner.path, "outer/inner");
        assert_eq!(inner.tests[1].log.as_deref(), Some("expected 4, got 5\n"));
        assert!(inner.tests[0].log.is_none());
    }

    #[test]
    fn test_flatten_keeps_order() {
        let suite = sample_suite();
        let report = RunReport::new(&suite, RunStats::new(), None, Duration::ZERO);
        let rows = report.flatten();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "outer/inner");
        assert_eq!(rows[0].1.name, "ok");
        assert!(rows[0].1.is_success());
        assert_eq!(rows[1].1.name, "broken");
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let suite = sample_suite();
        let report = RunReport::new(&suite, RunStats::new(), None, Duration::ZERO);
        let json = serde_json::to_value(&report).unwrap();
        let tests = &json["blocks"][0]["blocks"][0]["tests"];
        assert!(tests[0].get("log").is_none());
        assert_eq!(tests[1]["outcome"], "failure");
    }
}
