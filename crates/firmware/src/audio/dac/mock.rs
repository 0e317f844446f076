//! Mock DAC for host-side testing
//!
//! Implements [`DacDriver`] on top of [`platform::mocks::MockSampleSink`]
//! and counts initialisations for assertion in tests.

use platform::mocks::{MockSampleSink, MockSinkError};
use platform::SampleSink;

use super::DacDriver;

/// Mock DAC: records every sample and init call.
#[derive(Debug, Default)]
pub struct MockDac {
    /// Samples written so far
    pub sink: MockSampleSink,
    /// Number of [`DacDriver::init`] calls
    pub init_count: usize,
}

impl MockDac {
    /// Create a new mock DAC.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleSink for MockDac {
    type Error = MockSinkError;

    fn write_sample(&mut self, value: u8) -> Result<(), Self::Error> {
        self.sink.write_sample(value)
    }
}

impl DacDriver for MockDac {
    fn init(&mut self) -> Result<(), Self::Error> {
        self.init_count += 1;
        self.mute()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_init_mutes() {
        let mut dac = MockDac::new();
        dac.init().unwrap();
        assert_eq!(dac.init_count, 1);
        assert_eq!(dac.sink.samples(), &[0x80]);
    }

    #[test]
    fn test_mute_after_playback() {
        let mut dac = MockDac::new();
        dac.write_sample(0x12).unwrap();
        dac.mute().unwrap();
        assert_eq!(dac.sink.samples(), &[0x12, 0x80]);
    }
}
