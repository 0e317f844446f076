//! Task-side half of the pipeline.
//!
//! The producer waits for a vacated half and refills it from the current
//! asset block: the lower half from block bytes `0..200`, the upper half from
//! `200..400`. The block cursor advances once the upper half is filled, so
//! each block contributes 400 samples and its tail is never played.

use platform::config::{HALF_CAPACITY, MUSIC_START_BLOCK, RING_CAPACITY, TOTAL_MUSIC_BLOCKS};
use platform::{BlockDevice, IoError};

use crate::pipeline::Pipeline;
use crate::ring_buffer::Half;

/// Where the asset lives on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AssetLayout {
    /// First block of the asset.
    pub start_block: u32,
    /// Blocks in the loop. Zero is treated as one.
    pub total_blocks: u32,
}

impl AssetLayout {
    /// The music asset on the production card.
    pub const MUSIC: Self = Self {
        start_block: MUSIC_START_BLOCK,
        total_blocks: TOTAL_MUSIC_BLOCKS,
    };
}

/// Logical position within the asset, `0..total_blocks`, wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockCursor {
    position: u32,
    total: u32,
}

impl BlockCursor {
    /// Cursor at block 0 of a `total`-block loop.
    pub const fn new(total: u32) -> Self {
        Self {
            position: 0,
            total: if total == 0 { 1 } else { total },
        }
    }

    /// Current logical block.
    pub const fn position(self) -> u32 {
        self.position
    }

    /// Move to the next block, wrapping to 0 after the last.
    pub fn advance(&mut self) {
        let next = self.position.saturating_add(1);
        self.position = if next >= self.total { 0 } else { next };
    }
}

/// Refills the ring from a block device.
pub struct Producer<'a> {
    pipeline: &'a Pipeline,
    layout: AssetLayout,
    cursor: BlockCursor,
    staging: [u8; RING_CAPACITY],
}

impl<'a> Producer<'a> {
    /// Producer positioned at the first block of `layout`.
    pub fn new(pipeline: &'a Pipeline, layout: AssetLayout) -> Self {
        Self {
            pipeline,
            layout,
            cursor: BlockCursor::new(layout.total_blocks),
            staging: [0; RING_CAPACITY],
        }
    }

    /// Current session position.
    pub fn cursor(&self) -> BlockCursor {
        self.cursor
    }

    /// Card block the next refill reads from.
    pub fn current_block(&self) -> Result<u32, IoError> {
        self.layout
            .start_block
            .checked_add(self.cursor.position())
            .ok_or(IoError::BlockOutOfRange)
    }

    /// Fill `half` from the current block.
    ///
    /// On error the half is left unready and the cursor stays put, so the
    /// same block is tried again on the next refill.
    #[allow(clippy::cast_possible_truncation)] // Safety: offsets and HALF_CAPACITY < 512
    pub fn refill<D: BlockDevice>(&mut self, half: Half, device: &mut D) -> Result<(), IoError> {
        let stats = self.pipeline.stats();
        let read = match self.current_block() {
            Ok(block) => device.read_partial(
                block,
                &mut self.staging,
                half.offset() as u16,
                HALF_CAPACITY as u16,
            ),
            Err(e) => Err(e),
        };
        if let Err(e) = read {
            stats.record_read_error();
            return Err(e);
        }

        let data = self.staging.get(half.range()).unwrap_or(&[]);
        self.pipeline.ring().fill_half(half, data);
        stats.record_refill();

        if half == Half::Upper {
            self.cursor.advance();
        }
        Ok(())
    }

    /// Fill both halves before playback starts.
    ///
    /// Leaves the cursor on the second block, ready for the first vacated
    /// half.
    pub fn preload<D: BlockDevice>(&mut self, device: &mut D) -> Result<(), IoError> {
        self.refill(Half::Lower, device)?;
        self.refill(Half::Upper, device)
    }

    /// Wait for one refill message and serve it.
    pub async fn refill_next<D: BlockDevice>(&mut self, device: &mut D) -> Result<Half, IoError> {
        let half = self.pipeline.refills().next().await;
        self.refill(half, device).map(|()| half)
    }

    /// Serve refill messages forever. Read errors are logged and counted.
    pub async fn run<D: BlockDevice>(&mut self, device: &mut D) {
        loop {
            match self.refill_next(device).await {
                Ok(_half) => {
                    #[cfg(feature = "defmt")]
                    defmt::trace!("refilled {}", _half);
                }
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "refill of block {} failed: {}",
                        self.cursor.position(),
                        _e
                    );
                }
            }
        }
    }
}
