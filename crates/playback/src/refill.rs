//! Interrupt → task refill messages.
//!
//! The sample interrupt posts the half it just vacated; the refill task
//! receives it. Each half is queued at most once: a post for a half whose
//! previous message has not been received yet is refused, so the queue
//! never holds more than one message per half and the producer always sees
//! them alternate. A refused post means the refill task has fallen a whole
//! buffer behind.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::ring_buffer::Half;

/// Maximum outstanding refill messages.
pub const REFILL_QUEUE_DEPTH: usize = 2;

/// Bounded queue of vacated halves, at most one message per half.
pub struct RefillQueue {
    channel: Channel<CriticalSectionRawMutex, Half, REFILL_QUEUE_DEPTH>,
    lower_pending: AtomicBool,
    upper_pending: AtomicBool,
}

impl RefillQueue {
    /// Create an empty queue. `const` so it can live in a `static`.
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            lower_pending: AtomicBool::new(false),
            upper_pending: AtomicBool::new(false),
        }
    }

    fn flag(&self, half: Half) -> &AtomicBool {
        match half {
            Half::Lower => &self.lower_pending,
            Half::Upper => &self.upper_pending,
        }
    }

    /// Post from interrupt context. Never blocks.
    ///
    /// Returns `false` when `half` is still queued from an earlier post; the
    /// new message is dropped.
    pub fn post(&self, half: Half) -> bool {
        let flag = self.flag(half);
        if flag.swap(true, Ordering::AcqRel) {
            return false;
        }
        if self.channel.try_send(half).is_err() {
            flag.store(false, Ordering::Release);
            return false;
        }
        true
    }

    fn received(&self, half: Half) -> Half {
        self.flag(half).store(false, Ordering::Release);
        half
    }

    /// Wait for the next vacated half.
    pub async fn next(&self) -> Half {
        let half = self.channel.receive().await;
        self.received(half)
    }

    /// Take the next vacated half if one is queued.
    pub fn try_next(&self) -> Option<Half> {
        self.channel.try_receive().ok().map(|half| self.received(half))
    }

    /// Whether a message for `half` is queued.
    pub fn is_pending(&self, half: Half) -> bool {
        self.flag(half).load(Ordering::Acquire)
    }

    /// Messages currently queued.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    /// Whether no refill is pending.
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for RefillQueue {
    fn default() -> Self {
        Self::new()
    }
}
