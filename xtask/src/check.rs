//! xtask check: every build configuration the slave board ships or tests in,
//! plus a silent card image for bench bring-up.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::time::Instant;

use crate::cargo::{self, OnFailure, Step, FIRMWARE_PACKAGE, TARGET};
use crate::pack_audio;

/// Where `check` leaves the silent card image.
const SILENT_IMAGE: &str = "target/xtask/silence.img";

const STEPS: &[Step<'static>] = &[
    Step {
        label: "Firmware (STM32H743, hardware)",
        args: &[
            "check",
            "-p",
            FIRMWARE_PACKAGE,
            "--target",
            TARGET,
            "--features",
            "hardware",
            "--bins",
        ],
        on_failure: OnFailure::Abort,
    },
    Step {
        label: "platform + playback (no_std)",
        args: &["check", "-p", "platform", "-p", "playback", "--target", TARGET],
        on_failure: OnFailure::Abort,
    },
    Step {
        label: "Host tests (simulated card)",
        args: &["check", "--workspace", "--tests"],
        on_failure: OnFailure::Abort,
    },
    Step {
        label: "Clippy",
        args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        on_failure: OnFailure::Warn,
    },
    Step {
        label: "Formatting",
        args: &["fmt", "--all", "--check"],
        on_failure: OnFailure::Warn,
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking pinball audio slave...".cyan().bold());
    println!();

    let start = Instant::now();
    let mut warnings = 0u32;
    for step in STEPS {
        let (ok, _) = cargo::run(step)?;
        if !ok {
            warnings = warnings.saturating_add(1);
        }
    }

    println!("{}", "  Packing silent card image...".cyan());
    let image = Path::new(SILENT_IMAGE);
    if let Some(dir) = image.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(image, pack_audio::pack(&[]))?;
    println!("{}", format!("  ✓ {SILENT_IMAGE}").green());
    println!();

    let summary = format!(
        "✓ Checks completed in {:.2}s ({} warning step(s))",
        start.elapsed().as_secs_f64(),
        warnings
    );
    if warnings == 0 {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.yellow().bold());
    }
    println!();
    Ok(())
}
