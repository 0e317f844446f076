//! DAC driver abstractions
//!
//! - `mcp4725` — Microchip MCP4725 over I²C (all targets; transport-generic)
//! - `mock` — in-process sink for host tests

pub mod mcp4725;
#[cfg(any(test, feature = "std"))]
pub mod mock;

use platform::config::SILENCE_SAMPLE;
use platform::SampleSink;

/// Slave-specific DAC trait, extending [`platform::SampleSink`].
pub trait DacDriver: SampleSink {
    /// Bring the converter up and park the output at mid-scale.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Drive the output to the silence level.
    fn mute(&mut self) -> Result<(), Self::Error> {
        self.write_sample(SILENCE_SAMPLE)
    }
}
