//! MCP4725 driver over a byte-level I²C transport
//!
//! Each sample is a complete five-byte transaction:
//! START, address, command, sample, low nibble, STOP. At 400 kHz that is
//! about 115 µs on the wire, well inside the ~181 µs sample period.

use platform::config::SILENCE_SAMPLE;
use platform::{I2cTransport, SampleSink};
use thiserror_no_std::Error;

use super::registers::{write_address, ADDRESS, CMD_WRITE_DAC, LOW_NIBBLE};
use crate::audio::dac::DacDriver;

/// DAC write failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacError {
    /// The transport did not complete the transaction in time or reported
    /// a bus fault. Acknowledge failures are not distinguished.
    #[error("I2C transport stalled")]
    TransportStall,
}

/// MCP4725 driver.
pub struct Mcp4725<I> {
    i2c: I,
    address_byte: u8,
}

impl<I: I2cTransport> Mcp4725<I> {
    /// Driver for the chip at the default address (0x60).
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, ADDRESS)
    }

    /// Driver for a chip with A0 strapped differently.
    pub fn with_address(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address_byte: write_address(address),
        }
    }

    /// Give back the transport.
    pub fn release(self) -> I {
        self.i2c
    }

    fn send_frame(&mut self, value: u8) -> Result<(), I::Error> {
        self.i2c.start()?;
        for byte in [self.address_byte, CMD_WRITE_DAC, value, LOW_NIBBLE] {
            self.i2c.write(byte)?;
        }
        Ok(())
    }
}

impl<I: I2cTransport> SampleSink for Mcp4725<I> {
    type Error = DacError;

    fn write_sample(&mut self, value: u8) -> Result<(), Self::Error> {
        let framed = self.send_frame(value);
        // STOP even after a failed byte so the bus is released.
        let stopped = self.i2c.stop();
        framed.and(stopped).map_err(|_| DacError::TransportStall)
    }
}

impl<I: I2cTransport> DacDriver for Mcp4725<I> {
    fn init(&mut self) -> Result<(), Self::Error> {
        self.write_sample(SILENCE_SAMPLE)?;
        #[cfg(feature = "defmt")]
        defmt::info!("MCP4725 at mid-scale");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests {
    use super::*;

    /// Records the byte-level conversation.
    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        fail_on_write: Option<usize>,
        writes: usize,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Start,
        Byte(u8),
        Stop,
    }

    impl I2cTransport for Recorder {
        type Error = ();

        fn start(&mut self) -> Result<(), ()> {
            self.events.push(Event::Start);
            Ok(())
        }

        fn write(&mut self, byte: u8) -> Result<(), ()> {
            self.writes += 1;
            if self.fail_on_write == Some(self.writes) {
                return Err(());
            }
            self.events.push(Event::Byte(byte));
            Ok(())
        }

        fn stop(&mut self) -> Result<(), ()> {
            self.events.push(Event::Stop);
            Ok(())
        }
    }

    #[test]
    fn test_sample_frame() {
        let mut dac = Mcp4725::new(Recorder::default());
        dac.write_sample(0xA7).unwrap();
        assert_eq!(
            dac.release().events,
            vec![
                Event::Start,
                Event::Byte(0xC0),
                Event::Byte(0x40),
                Event::Byte(0xA7),
                Event::Byte(0x00),
                Event::Stop,
            ]
        );
    }

    #[test]
    fn test_init_parks_at_mid_scale() {
        let mut dac = Mcp4725::new(Recorder::default());
        dac.init().unwrap();
        assert!(dac.release().events.contains(&Event::Byte(0x80)));
    }

    #[test]
    fn test_failed_byte_still_stops() {
        let mut dac = Mcp4725::new(Recorder {
            fail_on_write: Some(2),
            ..Recorder::default()
        });
        assert_eq!(dac.write_sample(0x10), Err(DacError::TransportStall));
        assert_eq!(
            dac.release().events,
            vec![Event::Start, Event::Byte(0xC0), Event::Stop]
        );
    }

    #[test]
    fn test_alternate_address() {
        let mut dac = Mcp4725::with_address(Recorder::default(), 0x61);
        dac.write_sample(0).unwrap();
        assert_eq!(dac.release().events[1], Event::Byte(0xC2));
    }
}
