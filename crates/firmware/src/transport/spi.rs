//! STM32 SPI as a byte-level [`SpiTransport`]
//!
//! Wraps an `embassy_stm32` SPI master. Transfers are blocking, one byte at
//! a time, matching the SD protocol's poll-a-byte style. The clock divider
//! is applied by reprogramming the peripheral's SCK frequency.

use embassy_embedded_hal::SetConfig;
use embassy_stm32::spi::{Config, Error, Instance, Spi};
use embassy_stm32::time::Hertz;
use platform::{ClockDivider, SpiTransport};

/// Blocking byte-wise SPI master.
pub struct Stm32Spi<'d, T: Instance, Tx, Rx> {
    spi: Spi<'d, T, Tx, Rx>,
    config: Config,
    kernel_hz: u32,
}

impl<'d, T: Instance, Tx, Rx> Stm32Spi<'d, T, Tx, Rx> {
    /// Wrap a configured peripheral clocked from `kernel_hz`.
    pub fn new(spi: Spi<'d, T, Tx, Rx>, config: Config, kernel_hz: u32) -> Self {
        Self {
            spi,
            config,
            kernel_hz,
        }
    }
}

impl<'d, T: Instance, Tx, Rx> SpiTransport for Stm32Spi<'d, T, Tx, Rx> {
    type Error = Error;

    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error> {
        let mut word = [byte];
        self.spi.blocking_transfer_in_place(&mut word)?;
        let [received] = word;
        Ok(received)
    }

    fn set_clock_divider(&mut self, divider: ClockDivider) -> Result<(), Self::Error> {
        self.config.frequency = Hertz(divider.frequency_hz(self.kernel_hz));
        defmt::debug!(
            "SPI clock /{=u32} = {=u32} Hz",
            divider.divisor(),
            self.config.frequency.0
        );
        // Only fails for frequencies the peripheral cannot reach at all.
        self.spi
            .set_config(&self.config)
            .map_err(|()| Error::ModeFault)
    }
}
