//! Interrupt-side half of the pipeline.
//!
//! [`SampleConsumer::tick`] runs once per sample period. It emits the sample
//! under the play index, advances, and posts a refill message whenever the
//! index leaves a half. Lower and upper messages therefore strictly
//! alternate.

use platform::config::{HALF_CAPACITY, RING_CAPACITY};
use platform::SampleSink;

use crate::pipeline::Pipeline;
use crate::ring_buffer::Half;

/// Owns the play index and the DAC sink.
pub struct SampleConsumer<'a, K> {
    pipeline: &'a Pipeline,
    sink: K,
    play_index: usize,
}

impl<'a, K: SampleSink> SampleConsumer<'a, K> {
    /// Start at slot 0.
    pub fn new(pipeline: &'a Pipeline, sink: K) -> Self {
        Self {
            pipeline,
            sink,
            play_index: 0,
        }
    }

    /// Next slot to be played.
    pub fn play_index(&self) -> usize {
        self.play_index
    }

    /// One sample period.
    ///
    /// Returns the half that was vacated on this tick, if any. A sink error
    /// does not stop the index: the sample is lost and counted as a stall.
    #[allow(clippy::arithmetic_side_effects)] // Safety: play_index < RING_CAPACITY, reset at wrap
    pub fn tick(&mut self) -> Option<Half> {
        let ring = self.pipeline.ring();
        let stats = self.pipeline.stats();

        if self.play_index == 0 || self.play_index == HALF_CAPACITY {
            let entering = Half::containing(self.play_index);
            if !ring.take_ready(entering) {
                stats.record_stale_half();
            }
        }

        if self.sink.write_sample(ring.sample(self.play_index)).is_err() {
            stats.record_dac_stall();
        }

        self.play_index += 1;
        let vacated = if self.play_index == HALF_CAPACITY {
            Some(Half::Lower)
        } else if self.play_index >= RING_CAPACITY {
            self.play_index = 0;
            Some(Half::Upper)
        } else {
            None
        };

        if let Some(half) = vacated {
            if !self.pipeline.refills().post(half) {
                stats.record_underrun();
            }
        }
        vacated
    }

    /// The sink, e.g. for writing silence on stop.
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Give the sink back.
    pub fn into_sink(self) -> K {
        self.sink
    }
}
