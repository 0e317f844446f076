//! Byte-level I²C on top of a transaction-level `embedded-hal` bus
//!
//! [`platform::I2cTransport`] exposes START / byte / STOP so the DAC driver
//! frames its own transactions. HALs only offer whole transactions, so this
//! adapter collects the bytes between `start` and `stop` and flushes them as
//! one `write`. The first byte of the frame is the address byte.
//!
//! The flush is where the bus actually runs: HAL timeouts and NACKs surface
//! from [`stop`](platform::I2cTransport::stop).

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use heapless::Vec;
use platform::I2cTransport;
use thiserror_no_std::Error;

/// Largest frame the adapter buffers, address byte included.
pub const MAX_FRAME: usize = 8;

/// Adapter errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum I2cError {
    /// `write` or `stop` without a preceding `start`.
    #[error("no transaction in progress")]
    NotStarted,
    /// More than [`MAX_FRAME`] bytes between `start` and `stop`.
    #[error("transaction exceeds frame buffer")]
    FrameTooLong,
    /// Address byte requested a read; only writes are supported.
    #[error("read transactions are not supported")]
    ReadNotSupported,
    /// The HAL reported a bus failure (timeout, NACK, arbitration loss).
    #[error("I2C bus error")]
    Bus(ErrorKind),
}

#[cfg(feature = "defmt")]
impl defmt::Format for I2cError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::NotStarted => defmt::write!(f, "NotStarted"),
            Self::FrameTooLong => defmt::write!(f, "FrameTooLong"),
            Self::ReadNotSupported => defmt::write!(f, "ReadNotSupported"),
            Self::Bus(_) => defmt::write!(f, "Bus"),
        }
    }
}

/// Buffers one transaction and hands it to the HAL on STOP.
pub struct BufferedI2c<I> {
    bus: I,
    frame: Vec<u8, MAX_FRAME>,
    open: bool,
}

impl<I: I2c> BufferedI2c<I> {
    /// Wrap a configured bus.
    pub fn new(bus: I) -> Self {
        Self {
            bus,
            frame: Vec::new(),
            open: false,
        }
    }

    /// Give back the bus.
    pub fn release(self) -> I {
        self.bus
    }
}

impl<I: I2c> I2cTransport for BufferedI2c<I> {
    type Error = I2cError;

    fn start(&mut self) -> Result<(), Self::Error> {
        // A repeated START discards whatever was collected.
        self.frame.clear();
        self.open = true;
        Ok(())
    }

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        if !self.open {
            return Err(I2cError::NotStarted);
        }
        self.frame.push(byte).map_err(|_| I2cError::FrameTooLong)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        if !core::mem::replace(&mut self.open, false) {
            return Err(I2cError::NotStarted);
        }
        let Some((&address_byte, payload)) = self.frame.split_first() else {
            // START immediately followed by STOP: nothing addressed.
            return Ok(());
        };
        if address_byte & 0x01 != 0 {
            return Err(I2cError::ReadNotSupported);
        }
        self.bus
            .write(address_byte >> 1, payload)
            .map_err(|e| I2cError::Bus(e.kind()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn test_frame_is_flushed_on_stop() {
        let expectations = [I2cTransaction::write(0x60, vec![0x40, 0x7F, 0x00])];
        let mut i2c = BufferedI2c::new(I2cMock::new(&expectations));
        i2c.start().unwrap();
        for b in [0xC0, 0x40, 0x7F, 0x00] {
            i2c.write(b).unwrap();
        }
        i2c.stop().unwrap();
        i2c.release().done();
    }

    #[test]
    fn test_write_without_start_is_rejected() {
        let mut i2c = BufferedI2c::new(I2cMock::new(&[]));
        assert_eq!(i2c.write(0xC0), Err(I2cError::NotStarted));
        assert_eq!(i2c.stop(), Err(I2cError::NotStarted));
        i2c.release().done();
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let mut i2c = BufferedI2c::new(I2cMock::new(&[]));
        i2c.start().unwrap();
        for b in 0..MAX_FRAME as u8 {
            i2c.write(b << 1).unwrap();
        }
        assert_eq!(i2c.write(0), Err(I2cError::FrameTooLong));
        i2c.release().done();
    }

    #[test]
    fn test_read_address_is_rejected() {
        let mut i2c = BufferedI2c::new(I2cMock::new(&[]));
        i2c.start().unwrap();
        i2c.write(0xC1).unwrap();
        assert_eq!(i2c.stop(), Err(I2cError::ReadNotSupported));
        i2c.release().done();
    }

    #[test]
    fn test_bus_error_is_reported() {
        let expectations =
            [I2cTransaction::write(0x60, vec![0x40, 0x80, 0x00]).with_error(ErrorKind::Other)];
        let mut i2c = BufferedI2c::new(I2cMock::new(&expectations));
        i2c.start().unwrap();
        for b in [0xC0, 0x40, 0x80, 0x00] {
            i2c.write(b).unwrap();
        }
        assert_eq!(i2c.stop(), Err(I2cError::Bus(ErrorKind::Other)));
        i2c.release().done();
    }
}
