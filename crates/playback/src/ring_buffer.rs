//! Fixed-size double buffer shared between the sample interrupt and the
//! refill task.
//!
//! `AudioRing` holds [`RING_CAPACITY`] unsigned 8-bit samples split into two
//! halves. The interrupt reads one slot per tick; the refill task overwrites
//! whichever half the interrupt has just left. No lock guards the slots:
//! correctness rests on the two sides never touching the same half at the
//! same time, which the refill protocol guarantees as long as a refill
//! finishes within one half traversal.
//!
//! Slots are atomics so the shared `static` is sound without `unsafe`. Every
//! access is a relaxed load or store; the per-half `ready` flag carries the
//! release/acquire edge that publishes a refill to the interrupt.

use core::ops::Range;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use platform::config::{HALF_CAPACITY, RING_CAPACITY, SILENCE_SAMPLE};

/// One of the two equal regions of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Half {
    /// Slots `0..200`.
    Lower,
    /// Slots `200..400`.
    Upper,
}

impl Half {
    /// First slot of the half. Also the block offset it is refilled from.
    pub const fn offset(self) -> usize {
        match self {
            Self::Lower => 0,
            Self::Upper => HALF_CAPACITY,
        }
    }

    /// Slot range covered by the half.
    #[allow(clippy::arithmetic_side_effects)] // Safety: offset + HALF_CAPACITY <= RING_CAPACITY
    pub const fn range(self) -> Range<usize> {
        self.offset()..self.offset() + HALF_CAPACITY
    }

    /// The opposite half.
    pub const fn other(self) -> Self {
        match self {
            Self::Lower => Self::Upper,
            Self::Upper => Self::Lower,
        }
    }

    /// Half containing slot `index`.
    pub const fn containing(index: usize) -> Self {
        if index < HALF_CAPACITY {
            Self::Lower
        } else {
            Self::Upper
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Lower => 0,
            Self::Upper => 1,
        }
    }
}

/// Interrupt-shared sample storage.
pub struct AudioRing {
    samples: [AtomicU8; RING_CAPACITY],
    ready: [AtomicBool; 2],
}

impl AudioRing {
    /// Create a ring full of silence with neither half ready.
    ///
    /// `const` so the ring can live in a `static`.
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)] // array-repeat seed, never used directly
        const SILENT: AtomicU8 = AtomicU8::new(SILENCE_SAMPLE);
        #[allow(clippy::declare_interior_mutable_const)]
        const NOT_READY: AtomicBool = AtomicBool::new(false);
        Self {
            samples: [SILENT; RING_CAPACITY],
            ready: [NOT_READY; 2],
        }
    }

    /// Total number of slots.
    pub const fn capacity(&self) -> usize {
        RING_CAPACITY
    }

    /// Sample at `index`. Out-of-range indices read as silence.
    pub fn sample(&self, index: usize) -> u8 {
        self.samples
            .get(index)
            .map_or(SILENCE_SAMPLE, |slot| slot.load(Ordering::Relaxed))
    }

    /// Overwrite `half` with `data` and mark it ready.
    ///
    /// Copies at most one half's worth; a short `data` leaves the tail of the
    /// half as it was.
    pub fn fill_half(&self, half: Half, data: &[u8]) {
        let slots = self.samples.get(half.range()).unwrap_or(&[]);
        for (slot, &byte) in slots.iter().zip(data) {
            slot.store(byte, Ordering::Relaxed);
        }
        if let Some(flag) = self.ready.get(half.slot()) {
            flag.store(true, Ordering::Release);
        }
    }

    /// Consume the ready mark of `half`.
    ///
    /// Returns `false` when the half was not refilled since it was last
    /// taken, meaning the interrupt is about to replay stale samples.
    pub fn take_ready(&self, half: Half) -> bool {
        self.ready
            .get(half.slot())
            .is_some_and(|flag| flag.swap(false, Ordering::Acquire))
    }

    /// Whether `half` holds fresh samples not yet entered by the interrupt.
    pub fn is_ready(&self, half: Half) -> bool {
        self.ready
            .get(half.slot())
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}

impl Default for AudioRing {
    fn default() -> Self {
        Self::new()
    }
}
