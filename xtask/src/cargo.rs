//! Cargo invocations shared by `check`, `test` and `flash`.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Firmware target triple.
pub const TARGET: &str = "thumbv7em-none-eabihf";

/// Package holding the firmware binary.
pub const FIRMWARE_PACKAGE: &str = "pinball-slave";

/// What a failing step does to the overall task.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Stop the task with an error.
    Abort,
    /// Report and carry on.
    Warn,
}

/// One `cargo` run.
pub struct Step<'a> {
    pub label: &'a str,
    pub args: &'a [&'a str],
    pub on_failure: OnFailure,
}

/// Tests passed and failed, summed over every test binary in one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TestTotals {
    pub passed: u32,
    pub failed: u32,
}

impl std::fmt::Display for TestTotals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} passed, {} failed", self.passed, self.failed)
    }
}

/// Run `step`, echoing its output only when it fails.
///
/// Returns whether it succeeded and the test totals found in its output.
pub fn run(step: &Step<'_>) -> Result<(bool, TestTotals)> {
    println!("{}", format!("  {}...", step.label).cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(step.args)
        .output()
        .with_context(|| format!("Failed to spawn cargo for '{}'", step.label))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let totals = test_totals(&stdout);

    if output.status.success() {
        let detail = if totals == TestTotals::default() {
            String::new()
        } else {
            format!(" ({totals})")
        };
        println!(
            "{}",
            format!(
                "  ✓ {}{} in {:.2}s",
                step.label,
                detail,
                start.elapsed().as_secs_f64()
            )
            .green()
        );
        return Ok((true, totals));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    match step.on_failure {
        OnFailure::Abort => {
            eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
            eprintln!();
            for line in stdout.lines().chain(stderr.lines()) {
                eprintln!("  {line}");
            }
            anyhow::bail!("{} failed", step.label)
        }
        OnFailure::Warn => {
            eprintln!("{}", format!("  ⚠ {} reported problems", step.label).yellow().bold());
            eprintln!("{stderr}");
            Ok((false, totals))
        }
    }
}

/// Sum the `test result:` lines cargo prints per test binary.
pub fn test_totals(output: &str) -> TestTotals {
    output
        .lines()
        .filter_map(|line| line.split("test result:").nth(1))
        .fold(TestTotals::default(), |acc, result| TestTotals {
            passed: acc.passed.saturating_add(count(result, "passed")),
            failed: acc.failed.saturating_add(count(result, "failed")),
        })
}

fn count(result: &str, label: &str) -> u32 {
    result
        .split(';')
        .find_map(|part| part.trim().strip_suffix(label))
        .and_then(|rest| rest.split_whitespace().last())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_sum_every_binary() {
        let output = "\
running 3 tests
test result: ok. 3 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.01s

running 5 tests
test result: FAILED. 4 passed; 1 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.20s
";
        assert_eq!(
            test_totals(output),
            TestTotals {
                passed: 7,
                failed: 1
            }
        );
    }

    #[test]
    fn test_totals_without_results_is_zero() {
        assert_eq!(test_totals("Compiling platform v0.1.0\n"), TestTotals::default());
    }
}
