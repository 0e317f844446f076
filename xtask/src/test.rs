//! xtask test: the host test tiers.
//!
//! Everything runs against `platform::mocks`; no probe is needed.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use std::time::Instant;

use crate::cargo::{self, OnFailure, Step, TestTotals, FIRMWARE_PACKAGE};

/// Test tier selectable with `--tier`.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Tier {
    /// `#[cfg(test)]` modules of every crate
    Unit,
    /// Simulated card → SD driver → producer → consumer
    Pipeline,
    /// proptest suites for addressing, dividers and partial reads
    Property,
    /// Doc examples
    Doc,
}

const TIERS: &[(Tier, Step<'static>)] = &[
    (
        Tier::Unit,
        Step {
            label: "Unit tests",
            args: &["test", "--workspace", "--lib", "--bins"],
            on_failure: OnFailure::Abort,
        },
    ),
    (
        Tier::Pipeline,
        Step {
            label: "Pipeline integration",
            args: &["test", "-p", FIRMWARE_PACKAGE, "--test", "integration_pipeline"],
            on_failure: OnFailure::Abort,
        },
    ),
    (
        Tier::Property,
        Step {
            label: "Address and divider properties",
            args: &["test", "-p", "platform", "--test", "storage_proptest"],
            on_failure: OnFailure::Abort,
        },
    ),
    (
        Tier::Property,
        Step {
            label: "Partial-read properties",
            args: &["test", "-p", FIRMWARE_PACKAGE, "--test", "partial_read_proptest"],
            on_failure: OnFailure::Abort,
        },
    ),
    (
        Tier::Doc,
        Step {
            label: "Doc tests",
            args: &["test", "--workspace", "--doc"],
            on_failure: OnFailure::Warn,
        },
    ),
];

/// Run `only`, or every tier when `None`.
pub fn run(only: Option<Tier>) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let start = Instant::now();
    let mut totals = TestTotals::default();
    for (tier, step) in TIERS {
        if only.is_some_and(|t| t != *tier) {
            continue;
        }
        let (_, step_totals) = cargo::run(step)?;
        totals.passed = totals.passed.saturating_add(step_totals.passed);
        totals.failed = totals.failed.saturating_add(step_totals.failed);
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ {} in {:.2}s",
            totals,
            start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();
    Ok(())
}
