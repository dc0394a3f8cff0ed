//! Built-in demo suite run by `isotest run`

use isotest::{ExecutionMode, Harness, Outcome, Result};
use std::io::{self, Write};

/// Register the demo blocks on `harness`
///
/// With `with_crash` an extra block of tests that abort or exit with an
/// out-of-range status is added.
pub fn register(harness: &mut Harness, with_crash: bool) -> Result<()> {
    harness.begin_block("arithmetic")?;
    harness.add_test("addition", || Outcome::from(2 + 2 == 4))?;
    harness.add_test("checked overflow", || {
        Outcome::from(i32::MAX.checked_add(1).is_none())
    })?;
    harness.add_test("float rounding", || {
        let sum = 0.1_f64 + 0.2;
        if (sum - 0.3).abs() < f64::EPSILON {
            Outcome::Success
        } else {
            let _ = writeln!(io::stdout(), "0.1 + 0.2 = {sum}");
            Outcome::Failure
        }
    })?;
    harness.end_block()?;

    harness.begin_block("text")?;
    harness.add_test("uppercase", || Outcome::from("isotest".to_uppercase() == "ISOTEST"))?;
    harness.add_test("split", || {
        Outcome::from("a/b/c".split('/').count() == 3)
    })?;
    harness.begin_block("utf8")?;
    harness.add_test("char count", || Outcome::from("n°".chars().count() == 2))?;
    harness.add_test("byte length", || Outcome::from("n°".len() == 3))?;
    harness.end_block()?;
    harness.end_block()?;

    harness.begin_block_with_mode("processes", ExecutionMode::Sequential)?;
    let parent = std::process::id();
    harness.add_test("runs in a child", move || {
        Outcome::from(std::process::id() != parent)
    })?;
    harness.add_test("environment inherited", || {
        Outcome::from(std::env::var_os("PATH").is_some())
    })?;
    harness.end_block()?;

    if with_crash {
        harness.begin_block("crashes")?;
        harness.add_test("abort", || -> Outcome {
            let _ = writeln!(io::stderr(), "about to abort");
            std::process::abort()
        })?;
        harness.add_test("exit 42", || -> Outcome { std::process::exit(42) })?;
        harness.add_test("error", || Outcome::Error)?;
        harness.end_block()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use isotest::HarnessConfig;

    #[test]
    fn test_demo_registration() {
        let mut harness = Harness::new();
        register(&mut harness, false).unwrap();

        let suite = harness.suite();
        assert_eq!(harness.depth(), 0);
        assert!(suite.find("crashes").is_none());
        let utf8 = suite.find("utf8").unwrap();
        assert_eq!(suite.path(utf8), "text/utf8");
        assert_eq!(suite.subtree_test_count(suite.root()), 9);
    }

    #[test]
    fn test_demo_with_crash_block() {
        let mut harness = Harness::with_config(HarnessConfig {
            colorize: false,
            ..Default::default()
        });
        register(&mut harness, true).unwrap();

        let mut out: Vec<u8> = Vec::new();
        assert!(!harness.run_tests_to(&mut out).unwrap());

        let stats = harness.stats();
        assert_eq!(stats.total, 12);
        assert_eq!(stats.bad_returns, 2);
        assert_eq!(stats.errors, 1);

        let out = String::from_utf8_lossy(&out);
        assert!(out.contains("in block 'crashes'"));
        assert!(out.contains("about to abort"));
    }
}
