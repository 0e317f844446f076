//! Audio streaming pipeline — SD blocks to an 8-bit DAC at a fixed sample rate
//!
//! A 400-slot double buffer sits between two contexts:
//!
//! ```text
//!  refill task (Producer)          sample interrupt (SampleConsumer)
//!  ─────────────────────           ─────────────────────────────────
//!  await RefillQueue  ◄──── post ── leave a half
//!  read_partial(block)             emit ring[play_index] to the DAC
//!  AudioRing::fill_half ─────────► take_ready on entering a half
//! ```
//!
//! [`PlaybackEngine`] masks or unmasks the interrupt; nothing else changes
//! when playback is toggled.
#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]

pub mod consumer;
pub mod engine;
pub mod pipeline;
pub mod producer;
pub mod refill;
pub mod ring_buffer;
pub mod stats;

pub use consumer::SampleConsumer;
pub use engine::{PlaybackEngine, PlaybackState, Transition};
pub use pipeline::Pipeline;
pub use producer::{AssetLayout, BlockCursor, Producer};
pub use refill::{RefillQueue, REFILL_QUEUE_DEPTH};
pub use ring_buffer::{AudioRing, Half};
pub use stats::{StatsSnapshot, StreamStats};
