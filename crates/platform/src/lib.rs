//! Hardware Abstraction Layer (HAL) for the pinball audio slave board
//!
//! This crate provides trait-based abstractions for the peripherals the slave
//! board drives, so the streaming pipeline and the drivers above it can be
//! developed and tested without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: SD driver, DAC driver, boot, commands)
//!         ↓
//! Feature Layer (playback: ring buffer, consumer, producer, engine)
//!         ↓
//! Platform HAL (this crate - trait abstractions, constants, errors)
//!         ↓
//! Hardware Layer (Embassy HAL + PAC)
//! ```
//!
//! # Abstractions
//!
//! - [`BlockDevice`] - 512-byte block reads from the audio card
//! - [`SampleSink`] - one 8-bit sample out per timer tick
//! - [`peripheral`] - SPI, I²C and sample-timer interfaces
//! - [`retry`] - bounded polling for every peripheral wait
//! - [`config`] - board constants and asset layout
//!
//! # Features
//!
//! - `std`: Enable standard library support and the [`mocks`] module
//! - `defmt`: Derive `defmt::Format` on all platform types
//!
//! # Example
//!
//! ```no_run
//! use platform::{BlockDevice, IoError};
//!
//! fn first_half<D: BlockDevice>(card: &mut D, buf: &mut [u8; 400]) -> Result<(), IoError> {
//!     card.read_partial(100, buf, 0, 200)
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod audio;
pub mod config;
pub mod mocks;
pub mod peripheral;
pub mod retry;
pub mod storage;

pub use audio::SampleSink;
pub use peripheral::{ClockDivider, I2cTransport, SampleTimer, SpiTransport, SPI_FILLER};
pub use retry::RetryBudget;
pub use storage::{
    BlockDevice, CardInfo, CardKind, CardState, InitError, IoError, ReadWindow, BLOCK_SIZE,
    CRC_BYTES,
};
