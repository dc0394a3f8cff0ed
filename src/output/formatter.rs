//! Output formatters for run reports
//!
//! Provides the indented tree summary plus JSON and CSV renderings.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write;

use crate::config::{HarnessConfig, LogPolicy};
use crate::errors::{HarnessError, Result};
use crate::models::Outcome;
use crate::results::{BlockReport, RunReport, TestReport};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// One indentation level of the tree report
const INDENT: &str = "    ";

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Tree,
    Json,
    JsonPretty,
    Csv,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tree" | "table" | "text" => Some(OutputFormat::Tree),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

/// Outcome label, green for success and red otherwise when `colorize` is set
pub fn outcome_label(outcome: Outcome, colorize: bool) -> String {
    if !colorize {
        return outcome.label().to_string();
    }
    let color = if outcome.is_success() { GREEN } else { RED };
    format!("{color}{}{RESET}", outcome.label())
}

/// Report formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
    show_logs: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
            show_logs: false,
        }
    }

    /// Formatter matching a harness configuration
    ///
    /// Captured logs are listed in the tree when every log is kept.
    pub fn from_config(config: &HarnessConfig) -> Self {
        let mut formatter = Self::new(config.format);
        if !config.colorize {
            formatter = formatter.no_color();
        }
        if config.log_policy == LogPolicy::Always {
            formatter = formatter.with_logs();
        }
        formatter
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Include captured logs of unsuccessful tests in the tree report
    pub fn with_logs(mut self) -> Self {
        self.show_logs = true;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a whole run
    pub fn format_run(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Tree => Ok(self.format_tree(report)),
            OutputFormat::Json => {
                serde_json::to_string(report).map_err(|e| HarnessError::Render(e.to_string()))
            }
            OutputFormat::JsonPretty => serde_json::to_string_pretty(report)
                .map_err(|e| HarnessError::Render(e.to_string())),
            OutputFormat::Csv => self.format_csv(report),
        }
    }

    fn format_tree(&self, report: &RunReport) -> String {
        let mut output = String::new();
        output.push_str("Summary:\n");
        for block in &report.blocks {
            self.format_block(&mut output, block, 0);
        }
        output.push_str(&self.format_global_stats(report));
        output
    }

    fn format_block(&self, output: &mut String, block: &BlockReport, depth: usize) {
        let flag = if block.success { "" } else { " [failed]" };
        let _ = writeln!(output, "{}: {:.4}s{}", block.name, block.duration_secs, flag);

        let number_width = block.tests.len().to_string().len();
        for test in &block.tests {
            output.push_str(&pipe_prefix(depth as isize));
            output.push_str(&self.format_test_line(test, number_width));
            output.push('\n');
            if self.show_logs && !test.is_success() {
                if let Some(log) = &test.log {
                    for line in log.lines() {
                        let _ = writeln!(output, "{}{INDENT}> {line}", pipe_prefix(depth as isize));
                    }
                }
            }
        }

        for child in &block.blocks {
            output.push_str(&pipe_prefix(depth as isize));
            self.format_block(output, child, depth + 1);
        }

        output.push_str(&pipe_prefix(depth as isize - 1));
        let _ = writeln!(output, "({})", block.name);
    }

    /// One test line: number, outcome, right-aligned duration, name
    pub fn format_test_line(&self, test: &TestReport, number_width: usize) -> String {
        let (label, plain_len) = match test.outcome {
            Some(outcome) => (
                outcome_label(outcome, self.colorize),
                outcome.label().len(),
            ),
            None => ("NOT_RUN".to_string(), "NOT_RUN".len()),
        };
        let padding = " ".repeat(Outcome::label_width().saturating_sub(plain_len));

        format!(
            "Test n°{:<width$}: {}{} {:>9.4}s ({})",
            test.number,
            label,
            padding,
            test.duration_secs,
            test.name,
            width = number_width
        )
    }

    fn format_global_stats(&self, report: &RunReport) -> String {
        let stats = &report.stats;
        let mut output = String::new();
        output.push_str("Global stats:\n");
        let _ = writeln!(
            output,
            "{} tests in {:.4}s",
            stats.total, report.total_duration_secs
        );
        let _ = writeln!(output, "Successes: {}", stats.successes);
        let _ = writeln!(output, "Failures: {}", stats.failures);
        let _ = writeln!(output, "Errors: {}", stats.errors);
        let _ = writeln!(output, "Bad returns: {}", stats.bad_returns);
        output
    }

    fn format_csv(&self, report: &RunReport) -> Result<String> {
        let render = |e: csv::Error| HarnessError::Render(e.to_string());
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(["block", "number", "name", "outcome", "duration_ms"])
            .map_err(render)?;
        for (path, test) in report.flatten() {
            writer
                .write_record([
                    path.to_string(),
                    test.number.to_string(),
                    test.name.clone(),
                    test.outcome.map(|o| o.label()).unwrap_or("NOT_RUN").to_string(),
                    format!("{:.3}", test.duration_secs * 1000.0),
                ])
                .map_err(render)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| HarnessError::Render(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| HarnessError::Render(e.to_string()))
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Tree)
    }
}

/// Tree prefix for a line nested `level` deep; nothing for negative levels
fn pipe_prefix(level: isize) -> String {
    if level < 0 {
        String::new()
    } else {
        format!("{}| ", INDENT.repeat(level as usize))
    }
}

/// Write a report to a file
pub fn write_report_to_file(
    path: &str,
    report: &RunReport,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_run(report)?;

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExecutionMode;
    use crate::results::RunStats;

    fn test_report(number: usize, name: &str, outcome: Outcome, secs: f64) -> TestReport {
        TestReport {
            number,
            name: name.to_string(),
            outcome: Some(outcome),
            duration_secs: secs,
            started_at: None,
            pid: None,
            diagnostics: Vec::new(),
            log: (!outcome.is_success()).then(|| "assertion failed\nleft: 5".to_string()),
        }
    }

    fn block(name: &str, path: &str, tests: Vec<TestReport>, blocks: Vec<BlockReport>) -> BlockReport {
        let success = tests.iter().all(|t| t.is_success());
        BlockReport {
            name: name.to_string(),
            path: path.to_string(),
            mode: ExecutionMode::Sequential,
            duration_secs: 0.5,
            success,
            subtree_success: success,
            tests,
            blocks,
        }
    }

    fn nested_report() -> RunReport {
        let inner = block(
            "inner",
            "outer/inner",
            vec![
                test_report(0, "a", Outcome::Success, 0.001),
                test_report(1, "b", Outcome::CrashOrBadReturn, 0.25),
            ],
            Vec::new(),
        );
        let outer = block("outer", "outer", Vec::new(), vec![inner]);

        let mut stats = RunStats::new();
        stats.record(Outcome::Success);
        stats.record(Outcome::CrashOrBadReturn);

        RunReport {
            started_at: None,
            total_duration_secs: 1.0,
            stats,
            all_passed: false,
            blocks: vec![outer],
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TREE"), Some(OutputFormat::Tree));
        assert_eq!(OutputFormat::from_str("unknown"), None);
    }

    #[test]
    fn test_outcome_label_colors() {
        assert_eq!(outcome_label(Outcome::Success, false), "SUCCESS");
        assert_eq!(outcome_label(Outcome::Success, true), "\x1b[32mSUCCESS\x1b[0m");
        assert_eq!(outcome_label(Outcome::Error, true), "\x1b[31mERROR\x1b[0m");
    }

    #[test]
    fn test_test_line_alignment() {
        let formatter = ResultFormatter::new(OutputFormat::Tree).no_color();
        let short = formatter.format_test_line(&test_report(0, "a", Outcome::Error, 0.5), 1);
        let long = formatter.format_test_line(&test_report(1, "b", Outcome::CrashOrBadReturn, 12.0), 1);

        assert_eq!(short, "Test n°0: ERROR         0.5000s (a)");
        assert_eq!(long, "Test n°1: BAD_RETURN   12.0000s (b)");
        assert_eq!(short.find("s ("), long.find("s ("));
    }

    #[test]
    fn test_tree_renders_nesting() {
        let formatter = ResultFormatter::new(OutputFormat::Tree).no_color();
        let output = formatter.format_run(&nested_report()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "Summary:");
        assert_eq!(lines[1], "outer: 0.5000s");
        assert_eq!(lines[2], "| inner: 0.5000s [failed]");
        assert!(lines[3].starts_with("    | Test n°0: SUCCESS"));
        assert!(lines[4].starts_with("    | Test n°1: BAD_RETURN"));
        assert_eq!(lines[5], "| (inner)");
        assert_eq!(lines[6], "(outer)");
        assert_eq!(lines[7], "Global stats:");
        assert_eq!(lines[8], "2 tests in 1.0000s");
        assert_eq!(lines[12], "Bad returns: 1");
    }

    #[test]
    fn test_tree_with_logs() {
        let formatter = ResultFormatter::new(OutputFormat::Tree).no_color().with_logs();
        let output = formatter.format_run(&nested_report()).unwrap();
        assert!(output.contains("    |     > assertion failed\n"));
        assert!(output.contains("    |     > left: 5\n"));
    }

    #[test]
    fn test_from_config_shows_logs_when_all_kept() {
        let mut config = HarnessConfig {
            colorize: false,
            ..Default::default()
        };
        let output = ResultFormatter::from_config(&config)
            .format_run(&nested_report())
            .unwrap();
        assert!(!output.contains("> assertion failed"));

        config.log_policy = LogPolicy::Always;
        let output = ResultFormatter::from_config(&config)
            .format_run(&nested_report())
            .unwrap();
        assert!(output.contains("    |     > assertion failed\n"));
    }

    #[test]
    fn test_empty_report() {
        let report = RunReport {
            started_at: None,
            total_duration_secs: 0.0,
            stats: RunStats::new(),
            all_passed: true,
            blocks: vec![block("empty", "empty", Vec::new(), Vec::new())],
        };
        let output = ResultFormatter::default().no_color().format_run(&report).unwrap();
        assert!(output.contains("empty: 0.5000s\n(empty)\n"));
        assert!(output.contains("0 tests in"));
    }

    #[test]
    fn test_csv_rows() {
        let formatter = ResultFormatter::new(OutputFormat::Csv);
        let output = formatter.format_run(&nested_report()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "block,number,name,outcome,duration_ms");
        assert_eq!(lines[1], "outer/inner,0,a,SUCCESS,1.000");
        assert_eq!(lines[2], "outer/inner,1,b,BAD_RETURN,250.000");
    }

    #[test]
    fn test_json_round_trip_fields() {
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let output = formatter.format_run(&nested_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["stats"]["bad_returns"], 1);
        assert_eq!(value["blocks"][0]["blocks"][0]["tests"][1]["outcome"], "crash_or_bad_return");
    }
}
