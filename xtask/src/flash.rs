//! xtask flash: build the firmware and run it on the board through probe-rs.
//!
//! `probe-rs run` stays attached and streams the defmt log, so its output is
//! inherited instead of captured.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;

use crate::cargo::{self, OnFailure, Step, FIRMWARE_PACKAGE, TARGET};

const CHIP: &str = "STM32H743ZITx";

const DEBUG_BUILD: &[&str] = &[
    "build",
    "-p",
    FIRMWARE_PACKAGE,
    "--target",
    TARGET,
    "--features",
    "hardware",
    "--bin",
    "firmware",
];

const RELEASE_BUILD: &[&str] = &[
    "build",
    "-p",
    FIRMWARE_PACKAGE,
    "--target",
    TARGET,
    "--features",
    "hardware",
    "--bin",
    "firmware",
    "--release",
];

fn elf_path(release: bool) -> String {
    let profile = if release { "release" } else { "debug" };
    format!("target/{TARGET}/{profile}/firmware")
}

pub fn run(release: bool) -> Result<()> {
    println!();
    println!("{}", "🔨 Building pinball audio slave...".cyan().bold());
    println!();

    cargo::run(&Step {
        label: if release { "Release build" } else { "Debug build" },
        args: if release { RELEASE_BUILD } else { DEBUG_BUILD },
        on_failure: OnFailure::Abort,
    })?;

    let elf = elf_path(release);
    show_sections(&elf);
    println!();

    println!("{}", format!("📡 Flashing {elf} to {CHIP}...").cyan().bold());
    println!(
        "   {}",
        "The board waits 5 s for the master, then sends 'A'. Ctrl-C detaches.".dimmed()
    );
    let status = Command::new("probe-rs")
        .args(["run", "--chip", CHIP, &elf])
        .status()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;

    if !status.success() {
        anyhow::bail!("probe-rs exited with {status}: check the probe and board power");
    }
    Ok(())
}

/// Print flash/RAM usage if `rust-size` (cargo-binutils) is available.
fn show_sections(elf: &str) {
    match Command::new("rust-size").arg(elf).output() {
        Ok(out) if out.status.success() => {
            println!("{}", "📊 Image size:".cyan());
            for line in String::from_utf8_lossy(&out.stdout).lines() {
                println!("   {}", line.dimmed());
            }
        }
        _ => println!(
            "   {}",
            "rust-size not found; skipping size report (cargo install cargo-binutils)".dimmed()
        ),
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_elf_path_follows_profile() {
        assert_eq!(elf_path(false), "target/thumbv7em-none-eabihf/debug/firmware");
        assert_eq!(elf_path(true), "target/thumbv7em-none-eabihf/release/firmware");
    }

    #[test]
    fn test_release_build_differs_only_by_flag() {
        assert_eq!(RELEASE_BUILD.len(), DEBUG_BUILD.len() + 1);
        assert_eq!(&RELEASE_BUILD[..DEBUG_BUILD.len()], DEBUG_BUILD);
        assert_eq!(RELEASE_BUILD.last(), Some(&"--release"));
    }
}
