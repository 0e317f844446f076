//! Pinball audio slave firmware
//!
//! Streams 8-bit PCM from a raw SD card to an MCP4725 DAC at ≈5.5 kHz and
//! takes play/pause and LED commands from the master board over a serial
//! link.
//!
//! # Architecture
//!
//! ```text
//! Application Layer (main.rs, command, boot)
//!         ↓
//! Streaming pipeline (playback crate)
//!         ↓
//! Device drivers (sd, audio::dac, audio::timer)
//!         ↓
//! Byte-level transports (transport) → Platform HAL (Embassy, STM32)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for STM32H7 target (embassy, embedded HAL)
//! - `defmt` - Structured logging through defmt
//! - `std` - Enable standard library (host testing with `platform::mocks`)
//!
//! # Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::unused_async)]

pub mod audio;
pub mod boot;
pub mod command;
pub mod sd;
pub mod transport;

// Re-export key types
pub use audio::{DacDriver, DacError, Mcp4725};
pub use boot::{BootError, BootReport};
pub use command::{
    Command, CommandController, Effect, LedPattern, LedPublisher, LedSelection, LedSpeed,
};
pub use sd::SdCard;
pub use transport::{BufferedI2c, I2cError};

#[cfg(any(test, feature = "std"))]
pub use audio::MockDac;
