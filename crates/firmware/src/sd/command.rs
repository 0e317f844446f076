//! SD SPI-mode command set
//!
//! Only the commands the slave needs: reset, interface check, operating
//! condition negotiation, OCR read and single-block read.
//!
//! Every command goes out as a 6-byte frame:
//!
//! ```text
//! | 01 | index (6) | argument (32, big-endian) | crc7 (7) | 1 |
//! ```
//!
//! The CRC is only checked by the card while it is still in SD mode, so
//! CMD0 and CMD8 carry their real CRC and everything else a dummy byte.

/// Idle R1: card is in the initialization state.
pub const R1_IDLE: u8 = 0x01;

/// Ready R1: no error bits, not idle.
pub const R1_READY: u8 = 0x00;

/// R1 byte meaning "no response yet" (bus idles high).
pub const R1_NONE: u8 = 0xFF;

/// Start token preceding a single-block read payload.
pub const DATA_START_TOKEN: u8 = 0xFE;

/// CMD8 argument: 2.7-3.6 V supply, check pattern 0xAA.
pub const IF_COND_ARGUMENT: u32 = 0x0000_01AA;

/// Check pattern the card must echo in the last byte of the R7 response.
pub const IF_COND_CHECK_PATTERN: u8 = 0xAA;

/// ACMD41 argument: host supports high-capacity cards (HCS, bit 30).
pub const HOST_CAPACITY_SUPPORT: u32 = 0x4000_0000;

/// Card capacity status bit in the first OCR byte.
pub const OCR_CCS: u8 = 0x40;

/// Placeholder CRC for commands issued after the card is in SPI mode.
const DUMMY_CRC: u8 = 0xFF;

/// Commands issued by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// CMD0: software reset into SPI mode.
    GoIdleState,
    /// CMD8: interface condition, identifies v2 cards.
    SendIfCond,
    /// CMD17: read one 512-byte block.
    ReadSingleBlock,
    /// CMD55: next command is application-specific.
    AppCmd,
    /// ACMD41: start initialization, report ready when done.
    SdSendOpCond,
    /// CMD58: read the operating conditions register.
    ReadOcr,
}

impl Command {
    /// Command index (the `n` in CMDn / ACMDn).
    pub const fn index(self) -> u8 {
        match self {
            Self::GoIdleState => 0,
            Self::SendIfCond => 8,
            Self::ReadSingleBlock => 17,
            Self::AppCmd => 55,
            Self::SdSendOpCond => 41,
            Self::ReadOcr => 58,
        }
    }

    /// First frame byte: start bit 0, transmission bit 1, index.
    pub const fn token(self) -> u8 {
        0x40 | self.index()
    }

    /// Last frame byte: CRC7 plus end bit.
    pub const fn crc(self) -> u8 {
        match self {
            Self::GoIdleState => 0x95,
            Self::SendIfCond => 0x87,
            _ => DUMMY_CRC,
        }
    }

    /// Complete 6-byte frame for `argument`.
    pub const fn frame(self, argument: u32) -> [u8; 6] {
        let a = argument.to_be_bytes();
        [self.token(), a[0], a[1], a[2], a[3], self.crc()]
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_go_idle_frame() {
        assert_eq!(
            Command::GoIdleState.frame(0),
            [0x40, 0x00, 0x00, 0x00, 0x00, 0x95]
        );
    }

    #[test]
    fn test_if_cond_frame() {
        assert_eq!(
            Command::SendIfCond.frame(IF_COND_ARGUMENT),
            [0x48, 0x00, 0x00, 0x01, 0xAA, 0x87]
        );
    }

    #[test]
    fn test_read_block_frame_is_big_endian() {
        assert_eq!(
            Command::ReadSingleBlock.frame(0x0001_9000),
            [0x51, 0x00, 0x01, 0x90, 0x00, 0xFF]
        );
    }

    #[test]
    fn test_app_commands() {
        assert_eq!(Command::AppCmd.token(), 0x77);
        assert_eq!(Command::SdSendOpCond.frame(HOST_CAPACITY_SUPPORT)[..2], [0x69, 0x40]);
        assert_eq!(Command::ReadOcr.token(), 0x7A);
    }
}
