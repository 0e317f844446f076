//! Playback state machine.
//!
//! `PlaybackEngine` gates the sample interrupt. Starting only unmasks the
//! timer: buffer contents and the play index are untouched, so a stop
//! followed by a start resumes where it left off. Stopping masks the timer
//! first and then parks the DAC at mid-scale so the speaker does not hold a
//! DC offset.
//!
//! Both operations are idempotent and report what they did.

use platform::config::SILENCE_SAMPLE;
use platform::{SampleSink, SampleTimer};

/// Current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
    /// Sample interrupt masked.
    Stopped,
    /// Sample interrupt running.
    Playing,
}

/// Outcome of a start/stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Stopped → Playing.
    Started,
    /// Playing → Stopped.
    Stopped,
    /// Already in the requested state.
    Unchanged,
}

/// Owns the sample timer.
pub struct PlaybackEngine<T> {
    timer: T,
    state: PlaybackState,
}

impl<T: SampleTimer> PlaybackEngine<T> {
    /// Engine in `Stopped`. Masks the timer in case it was left running.
    pub fn new(mut timer: T) -> Self {
        timer.disable();
        Self {
            timer,
            state: PlaybackState::Stopped,
        }
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether samples are being emitted.
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Unmask the sample interrupt.
    pub fn start(&mut self) -> Transition {
        match self.state {
            PlaybackState::Playing => Transition::Unchanged,
            PlaybackState::Stopped => {
                self.timer.enable();
                self.state = PlaybackState::Playing;
                Transition::Started
            }
        }
    }

    /// Mask the sample interrupt, then write silence to `sink`.
    ///
    /// The state is `Stopped` on return even if the silence write fails.
    pub fn stop<K: SampleSink>(&mut self, sink: &mut K) -> Result<Transition, K::Error> {
        match self.state {
            PlaybackState::Stopped => Ok(Transition::Unchanged),
            PlaybackState::Playing => {
                self.timer.disable();
                self.state = PlaybackState::Stopped;
                sink.write_sample(SILENCE_SAMPLE)?;
                Ok(Transition::Stopped)
            }
        }
    }

    /// The timer, for inspection.
    pub fn timer(&self) -> &T {
        &self.timer
    }
}
