//! MCP4725 12-bit I²C DAC (Microchip)
//!
//! Fed one 8-bit sample per timer tick from the sample interrupt.

pub mod registers;
mod driver;

pub use driver::{DacError, Mcp4725};
