//! Block storage abstraction
//!
//! The audio asset is read straight off a raw, unpartitioned card in 512-byte
//! blocks. Consumers only ever need a window of one block, so the single
//! operation here is [`BlockDevice::read_partial`].

use thiserror_no_std::Error;

/// Size of one addressable block in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Trailing CRC bytes that follow every data block on the wire.
pub const CRC_BYTES: usize = 2;

/// Addressing mode reported by the card during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardKind {
    /// SDSC: read commands take a byte address.
    Standard,
    /// SDHC/SDXC: read commands take a block number.
    HighCapacity,
}

impl CardKind {
    /// Argument the read command expects for `block`.
    ///
    /// `None` when a standard-capacity card cannot address the block in
    /// 32 bits.
    pub fn wire_address(self, block: u32) -> Option<u32> {
        match self {
            Self::Standard => block.checked_mul(BLOCK_SIZE as u32),
            Self::HighCapacity => Some(block),
        }
    }
}

/// Lifecycle of a storage device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardState {
    /// Not yet initialized.
    Uninitialized,
    /// Initialized and ready for reads.
    Idle(CardKind),
    /// The last initialization attempt failed.
    Failed,
}

/// Result of a successful initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CardInfo {
    /// Addressing mode.
    pub kind: CardKind,
    /// Divider the bus runs at from now on.
    pub bus_divider: crate::peripheral::ClockDivider,
}

/// Initialization failures. All of them are fatal for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// CMD0 never produced the idle response.
    #[error("card did not enter idle state")]
    NotResponding,
    /// CMD8 was rejected: version 1 or MMC card.
    #[error("card does not support CMD8 (v1 or MMC)")]
    UnsupportedCard,
    /// CMD8 answered but did not echo the check pattern.
    #[error("voltage check pattern mismatch")]
    VoltageCheckFailed,
    /// ACMD41 never reported the card ready.
    #[error("card did not leave idle state in time")]
    Timeout,
    /// The SPI transport itself failed.
    #[error("SPI transport error")]
    Bus,
}

/// Per-read failures. The device remains usable after any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// The requested window does not fit inside one block or the buffer.
    #[error("read window outside block or buffer")]
    OffsetOutOfRange,
    /// The card answered the read command with a non-zero R1.
    #[error("read command rejected")]
    CommandRejected,
    /// The data start token never arrived.
    #[error("timed out waiting for data token")]
    DataTokenTimeout,
    /// Read issued before a successful initialization.
    #[error("card not initialized")]
    CardNotReady,
    /// Block number not addressable by this card.
    #[error("block out of addressable range")]
    BlockOutOfRange,
    /// The SPI transport itself failed.
    #[error("SPI transport error")]
    Bus,
}

/// A validated `[offset, offset + len)` window into one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadWindow {
    offset: usize,
    len: usize,
}

impl ReadWindow {
    /// Validate a window against the block size and a destination of
    /// `buffer_len` bytes.
    ///
    /// The payload lands at `buffer[offset..offset + len]`, so the buffer
    /// must cover the window's end. `offset` must point inside the block
    /// even when `len` is zero.
    pub fn new(offset: u16, len: u16, buffer_len: usize) -> Result<Self, IoError> {
        let offset = usize::from(offset);
        let len = usize::from(len);
        let end = offset.checked_add(len).ok_or(IoError::OffsetOutOfRange)?;
        if offset >= BLOCK_SIZE || end > BLOCK_SIZE || end > buffer_len {
            return Err(IoError::OffsetOutOfRange);
        }
        Ok(Self { offset, len })
    }

    /// First byte of the window within the block.
    pub const fn offset(self) -> usize {
        self.offset
    }

    /// Window length in bytes.
    pub const fn len(self) -> usize {
        self.len
    }

    /// Whether the window is empty.
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    /// One past the last byte of the window.
    #[allow(clippy::arithmetic_side_effects)] // Safety: bounded by BLOCK_SIZE in new()
    pub const fn end(self) -> usize {
        self.offset + self.len
    }

    /// Block bytes clocked and discarded after the window.
    #[allow(clippy::arithmetic_side_effects)] // Safety: end() <= BLOCK_SIZE
    pub const fn trailing(self) -> usize {
        BLOCK_SIZE - self.end()
    }
}

/// Random-access reads of fixed 512-byte blocks.
pub trait BlockDevice {
    /// Read bytes `[offset, offset + length)` of `block` into
    /// `buffer[offset..offset + length]`.
    ///
    /// Bytes of `buffer` outside that range are left untouched. Invalid
    /// windows fail with [`IoError::OffsetOutOfRange`] before any bus
    /// traffic.
    fn read_partial(
        &mut self,
        block: u32,
        buffer: &mut [u8],
        offset: u16,
        length: u16,
    ) -> Result<(), IoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_cards_use_byte_addresses() {
        assert_eq!(CardKind::Standard.wire_address(100), Some(51_200));
        assert_eq!(CardKind::HighCapacity.wire_address(100), Some(100));
        assert_eq!(CardKind::Standard.wire_address(u32::MAX), None);
        assert_eq!(CardKind::HighCapacity.wire_address(u32::MAX), Some(u32::MAX));
    }

    #[test]
    fn window_accepts_block_edges() {
        let full = ReadWindow::new(0, 512, 512);
        assert_eq!(full.map(ReadWindow::trailing), Ok(0));
        let last = ReadWindow::new(511, 1, 512);
        assert_eq!(last.map(ReadWindow::end), Ok(512));
        let upper = ReadWindow::new(200, 200, 400);
        assert_eq!(upper.map(ReadWindow::trailing), Ok(112));
    }

    #[test]
    fn window_rejects_out_of_block() {
        assert_eq!(ReadWindow::new(512, 0, 1024), Err(IoError::OffsetOutOfRange));
        assert_eq!(ReadWindow::new(400, 113, 1024), Err(IoError::OffsetOutOfRange));
        assert_eq!(ReadWindow::new(u16::MAX, u16::MAX, usize::MAX), Err(IoError::OffsetOutOfRange));
    }

    #[test]
    fn window_rejects_short_buffer() {
        assert_eq!(ReadWindow::new(200, 200, 399), Err(IoError::OffsetOutOfRange));
        assert!(ReadWindow::new(0, 0, 0).is_ok_and(ReadWindow::is_empty));
    }
}
