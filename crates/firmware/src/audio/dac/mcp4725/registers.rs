//! MCP4725 command encoding
//!
//! Source: Microchip MCP4725 datasheet DS22039D, §6.
//!
//! The slave writes the DAC register in "write DAC register" mode (C2..C0 =
//! 010), which takes three bytes after the address: command, then the
//! 12-bit value left-aligned across two bytes.
//!
//! ```text
//! byte 1: C2 C1 C0 x x PD1 PD0 x   → 0x40 (write DAC, normal power)
//! byte 2: D11 .. D4                 → 8-bit sample
//! byte 3: D3 D2 D1 D0 x x x x       → 0x00
//! ```

/// 7-bit address with A0 tied low.
pub const ADDRESS: u8 = 0x60;

/// Command byte: write DAC register, power-down bits 00 (normal).
pub const CMD_WRITE_DAC: u8 = 0x40;

/// Low data byte for 8-bit samples: D3..D0 zero.
pub const LOW_NIBBLE: u8 = 0x00;

/// Address byte for a write transaction to `address`.
pub const fn write_address(address: u8) -> u8 {
    (address << 1) & 0xFE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_address_byte() {
        assert_eq!(write_address(ADDRESS), 0xC0);
        assert_eq!(write_address(0x61), 0xC2);
    }
}
