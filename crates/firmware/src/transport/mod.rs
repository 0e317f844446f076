//! Adapters from HAL peripherals to the byte-level platform transports
//!
//! - `i2c` — [`BufferedI2c`], any `embedded_hal::i2c::I2c` as a
//!   [`platform::I2cTransport`]
//! - `spi` — STM32 SPI as a [`platform::SpiTransport`] (`hardware` feature)

pub mod i2c;

#[cfg(feature = "hardware")]
pub mod spi;

pub use i2c::{BufferedI2c, I2cError};
