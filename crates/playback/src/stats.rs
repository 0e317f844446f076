//! Pipeline health counters.
//!
//! Written from both the interrupt and the refill task, read by the
//! heartbeat. Relaxed atomics: the counters are diagnostics, not
//! synchronisation.

use core::sync::atomic::{AtomicU32, Ordering};

/// Live counters.
pub struct StreamStats {
    refills: AtomicU32,
    read_errors: AtomicU32,
    underruns: AtomicU32,
    stale_halves: AtomicU32,
    dac_stalls: AtomicU32,
}

/// Point-in-time copy of [`StreamStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatsSnapshot {
    /// Halves refilled successfully.
    pub refills: u32,
    /// Block reads that failed.
    pub read_errors: u32,
    /// Refill messages dropped because that half was still queued.
    pub underruns: u32,
    /// Halves the interrupt entered before they were refilled.
    pub stale_halves: u32,
    /// Samples the DAC sink failed to emit.
    pub dac_stalls: u32,
}

impl StreamStats {
    /// All counters at zero.
    pub const fn new() -> Self {
        Self {
            refills: AtomicU32::new(0),
            read_errors: AtomicU32::new(0),
            underruns: AtomicU32::new(0),
            stale_halves: AtomicU32::new(0),
            dac_stalls: AtomicU32::new(0),
        }
    }

    pub(crate) fn record_refill(&self) {
        self.refills.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_half(&self) {
        self.stale_halves.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dac_stall(&self) {
        self.dac_stalls.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            refills: self.refills.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            stale_halves: self.stale_halves.load(Ordering::Relaxed),
            dac_stalls: self.dac_stalls.load(Ordering::Relaxed),
        }
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}
