//! Application configuration and constants
//!
//! Every tunable of the slave board lives here: asset layout on the card,
//! buffer geometry, bus speeds and timeouts. Drivers and the pipeline take
//! these by reference rather than hardcoding their own copies, so the image
//! packer in `xtask` and the firmware can never disagree about the layout.

use crate::retry::RetryBudget;

/// The application name
pub const APP_NAME: &str = "Pinball Audio Slave";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Audio asset layout ──────────────────────────────────────────────────────

/// First card block of the music asset.
pub const MUSIC_START_BLOCK: u32 = 100;

/// Size of the source audio file in bytes (8-bit unsigned PCM).
pub const MUSIC_FILE_SIZE: u32 = 248_000;

/// Number of consecutive blocks playback loops over.
///
/// Derived from the file size in whole 512-byte blocks. Only the first
/// [`RING_CAPACITY`] bytes of each block are played, so the looped stream is
/// `TOTAL_MUSIC_BLOCKS * RING_CAPACITY` bytes long.
pub const TOTAL_MUSIC_BLOCKS: u32 = MUSIC_FILE_SIZE / crate::storage::BLOCK_SIZE as u32;

// ── Ring buffer geometry ────────────────────────────────────────────────────

/// Total sample slots in the playback ring.
pub const RING_CAPACITY: usize = 400;

/// Slots per half. One half plays while the other is refilled.
pub const HALF_CAPACITY: usize = RING_CAPACITY / 2;

/// Sample written to the DAC on stop (8-bit unsigned mid-scale).
pub const SILENCE_SAMPLE: u8 = 0x80;

// ── Sample clock ────────────────────────────────────────────────────────────

/// Input clock of the sample timer after prescaling.
pub const TIMER_CLOCK_HZ: u32 = 16_000_000;

/// Compare value for the sample timer in clear-on-match mode.
pub const SAMPLE_TIMER_COMPARE: u16 = 0x0B55;

/// Nominal sample rate produced by [`SAMPLE_TIMER_COMPARE`] (≈5513 Hz).
#[allow(clippy::arithmetic_side_effects)] // Safety: u16 + 1 fits u32
pub const fn sample_rate_hz() -> u32 {
    // CTC period is compare + 1 timer clocks.
    let period = SAMPLE_TIMER_COMPARE as u32 + 1;
    match TIMER_CLOCK_HZ.checked_div(period) {
        Some(hz) => hz,
        None => 0,
    }
}

// ── SD card over SPI ────────────────────────────────────────────────────────

/// SPI1 kernel clock (PLL1Q). Every SD bus speed is a divider of this.
pub const SPI_KERNEL_HZ: u32 = 50_000_000;

/// Upper bound of the SD identification clock window.
pub const SD_IDENT_MAX_HZ: u32 = 400_000;

/// Upper bound of the default-speed SD clock.
pub const SD_FAST_MAX_HZ: u32 = 25_000_000;

/// SPI divisor used during card identification. Resolved through
/// [`ClockDivider::nearest`](crate::peripheral::ClockDivider::nearest).
pub const SD_IDENT_DIVISOR: u32 = 128;

/// SPI divisor used after initialization succeeds.
pub const SD_FAST_DIVISOR: u32 = 4;

/// Filler bytes clocked with the card deselected before CMD0.
pub const SD_WAKE_FILLER_BYTES: usize = 10;

/// Bytes polled for an R1 response after a command frame.
pub const SD_RESPONSE_POLLS: RetryBudget = RetryBudget::new(8);

/// ACMD41 rounds before initialization gives up, and bytes polled for a
/// data start token.
pub const SD_TIMEOUT_POLLS: RetryBudget = RetryBudget::new(5000);

// ── DAC over I²C ────────────────────────────────────────────────────────────

/// 7-bit bus address of the MCP4725.
pub const DAC_I2C_ADDRESS: u8 = 0x60;

/// I²C SCL frequency.
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

// ── Boot ────────────────────────────────────────────────────────────────────

/// Pause after peripheral bring-up, giving the master board time to boot.
pub const STARTUP_SETTLE_MS: u32 = 5000;

/// Baud rate of the command link to the master board (8N1).
pub const SERIAL_BAUD: u32 = 9_600;

/// Byte sent on the serial link once the board is ready for commands.
pub const READY_BYTE: u8 = b'A';

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::peripheral::ClockDivider;

    #[test]
    fn block_count_matches_file_size() {
        assert_eq!(TOTAL_MUSIC_BLOCKS, 484);
    }

    #[test]
    fn ring_payload_fits_one_block() {
        assert!(RING_CAPACITY <= crate::storage::BLOCK_SIZE);
        assert_eq!(HALF_CAPACITY * 2, RING_CAPACITY);
    }

    #[test]
    fn sd_identification_clock_is_in_window() {
        let ident = ClockDivider::nearest(SD_IDENT_DIVISOR).frequency_hz(SPI_KERNEL_HZ);
        assert!(ident <= SD_IDENT_MAX_HZ, "identification SCK {ident} Hz");
        assert!(ident >= 100_000, "identification SCK {ident} Hz");
    }

    #[test]
    fn sd_fast_clock_is_default_speed() {
        let fast = ClockDivider::nearest(SD_FAST_DIVISOR).frequency_hz(SPI_KERNEL_HZ);
        assert_eq!(fast, 12_500_000);
        assert!(fast <= SD_FAST_MAX_HZ);
    }

    #[test]
    fn sample_rate_is_about_5513_hz() {
        assert_eq!(sample_rate_hz(), 5513);
    }
}
