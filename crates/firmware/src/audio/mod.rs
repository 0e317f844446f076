//! Audio output: the DAC sample sink and the sample-rate timer
//!
//! Vertically sliced: one sub-directory per hardware component.
//!
//! # Structure
//!
//! - `dac/` — DAC drivers (`Mcp4725` for every target, `MockDac` for tests)
//! - `timer` — TIM3 sample clock (`hardware` feature) and its reload math
//!
//! # Dependency Injection
//!
//! The streaming pipeline targets [`platform::SampleSink`] and
//! [`platform::SampleTimer`]. Concrete types are injected at the call site:
//!
//! ```rust,ignore
//! // Hardware:
//! SampleConsumer::new(&PIPELINE, Mcp4725::new(BufferedI2c::new(i2c)));
//! // Tests:
//! SampleConsumer::new(&pipeline, MockDac::new());
//! ```

pub mod dac;
pub mod timer;

pub use dac::mcp4725::{DacError, Mcp4725};
pub use dac::DacDriver;

#[cfg(any(test, feature = "std"))]
pub use dac::mock::MockDac;
