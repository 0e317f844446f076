//! Shared state of one streaming pipeline.

use crate::refill::RefillQueue;
use crate::ring_buffer::AudioRing;
use crate::stats::{StatsSnapshot, StreamStats};

/// Everything the sample interrupt and the refill task share.
///
/// Intended to live in a `static`; both sides borrow it for `'static`.
pub struct Pipeline {
    ring: AudioRing,
    refills: RefillQueue,
    stats: StreamStats,
}

impl Pipeline {
    /// Empty ring, empty queue, zeroed counters.
    pub const fn new() -> Self {
        Self {
            ring: AudioRing::new(),
            refills: RefillQueue::new(),
            stats: StreamStats::new(),
        }
    }

    /// Sample storage.
    pub fn ring(&self) -> &AudioRing {
        &self.ring
    }

    /// Vacated-half messages.
    pub fn refills(&self) -> &RefillQueue {
        &self.refills
    }

    /// Health counters.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Shorthand for `stats().snapshot()`.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
