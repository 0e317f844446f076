//! SD card access in SPI mode
//!
//! - `command` — frame encoding and response constants
//! - `driver` — [`SdCard`], implementing [`platform::BlockDevice`]

pub mod command;
mod driver;

pub use driver::SdCard;
