// Desktop/tooling crate — unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod cargo;
mod check;
mod flash;
mod pack_audio;
mod test;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Pinball audio slave development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flash firmware to STM32H7 hardware via probe-rs
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
    },
    /// Check every build configuration and pack a silent card image
    Check,
    /// Run the host test tiers against the simulated peripherals
    Test {
        /// Run only this tier
        #[arg(long, value_enum)]
        tier: Option<test::Tier>,
    },
    /// Lay an 8-bit unsigned PCM file into a raw SD card image
    PackAudio {
        /// Raw PCM input (8-bit unsigned, mono, ≈5513 Hz)
        #[arg(long)]
        input: std::path::PathBuf,
        /// Card image to write
        #[arg(long)]
        output: std::path::PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Flash { release } => flash::run(release),
        Commands::Check => check::run(),
        Commands::Test { tier } => test::run(tier),
        Commands::PackAudio { input, output } => pack_audio::run(&input, &output),
    }
}
