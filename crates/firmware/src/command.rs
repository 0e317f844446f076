//! Serial command protocol from the master board
//!
//! The master sends single ASCII bytes. Unknown bytes are ignored.
//!
//! | Byte        | Command                         |
//! |-------------|---------------------------------|
//! | `B`         | start playback                  |
//! | `C`         | pause playback (output → 0x80)  |
//! | `U` .. `Z`  | select LED matrix pattern       |
//! | `1` .. `3`  | select LED animation speed      |
//!
//! The slave answers nothing except [`READY_BYTE`](platform::config::READY_BYTE)
//! once its command task is listening.
//!
//! LED commands only change the selection published in a [`LedPublisher`];
//! drawing the matrix is up to whoever reads it.

use core::sync::atomic::{AtomicU16, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use platform::{SampleSink, SampleTimer};
use playback::{PlaybackEngine, Transition};

/// LED matrix animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedPattern {
    /// `U`: all off / all on.
    #[default]
    Blink,
    /// `V`: nibble bouncing across the row.
    Sweep,
    /// `W`: single bit per nibble bouncing.
    Chase,
    /// `X`: alternating checkerboard.
    Checker,
    /// `Y`: fill from the left, drain to the right.
    Fill,
    /// `Z`: grow from the centre and shrink back.
    Pulse,
}

impl LedPattern {
    /// Pattern selected by a command byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'U' => Some(Self::Blink),
            b'V' => Some(Self::Sweep),
            b'W' => Some(Self::Chase),
            b'X' => Some(Self::Checker),
            b'Y' => Some(Self::Fill),
            b'Z' => Some(Self::Pulse),
            _ => None,
        }
    }

    /// The command byte that selects this pattern.
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Blink => b'U',
            Self::Sweep => b'V',
            Self::Chase => b'W',
            Self::Checker => b'X',
            Self::Fill => b'Y',
            Self::Pulse => b'Z',
        }
    }
}

/// LED animation speed, in refresh cycles per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedSpeed {
    /// `1`
    #[default]
    Slow,
    /// `2`
    Medium,
    /// `3`
    Fast,
}

impl LedSpeed {
    /// Speed selected by a command byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(Self::Slow),
            b'2' => Some(Self::Medium),
            b'3' => Some(Self::Fast),
            _ => None,
        }
    }

    /// The command byte that selects this speed.
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Slow => b'1',
            Self::Medium => b'2',
            Self::Fast => b'3',
        }
    }

    /// Matrix refresh cycles each frame is held for.
    pub const fn cycles_per_frame(self) -> u8 {
        match self {
            Self::Slow => 20,
            Self::Medium => 10,
            Self::Fast => 5,
        }
    }
}

/// What the LED matrix should currently show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedSelection {
    /// Active animation
    pub pattern: LedPattern,
    /// Active speed
    pub speed: LedSpeed,
}

/// Latest [`LedSelection`], readable from any context.
///
/// The selection is stored as its two command bytes packed into one atomic
/// word, so readers never see a pattern from one update and a speed from
/// another. [`changed`](Self::changed) wakes one task per update.
pub struct LedPublisher {
    packed: AtomicU16,
    changed: Signal<CriticalSectionRawMutex, LedSelection>,
}

impl LedPublisher {
    /// Publisher holding the default selection. `const` so it can live in a
    /// `static`.
    pub const fn new() -> Self {
        Self {
            packed: AtomicU16::new(pack(LedSelection {
                pattern: LedPattern::Blink,
                speed: LedSpeed::Slow,
            })),
            changed: Signal::new(),
        }
    }

    /// Replace the selection and wake a waiting reader.
    pub fn publish(&self, selection: LedSelection) {
        self.packed.store(pack(selection), Ordering::Release);
        self.changed.signal(selection);
    }

    /// Selection currently in effect.
    pub fn current(&self) -> LedSelection {
        unpack(self.packed.load(Ordering::Acquire))
    }

    /// Wait for the next [`publish`](Self::publish).
    pub async fn changed(&self) -> LedSelection {
        self.changed.wait().await
    }
}

impl Default for LedPublisher {
    fn default() -> Self {
        Self::new()
    }
}

const fn pack(selection: LedSelection) -> u16 {
    u16::from_be_bytes([selection.pattern.to_byte(), selection.speed.to_byte()])
}

fn unpack(word: u16) -> LedSelection {
    let [pattern, speed] = word.to_be_bytes();
    LedSelection {
        pattern: LedPattern::from_byte(pattern).unwrap_or_default(),
        speed: LedSpeed::from_byte(speed).unwrap_or_default(),
    }
}

/// Decoded command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Start playback.
    Play,
    /// Stop playback and silence the output.
    Pause,
    /// Switch LED animation.
    Pattern(LedPattern),
    /// Switch LED speed.
    Speed(LedSpeed),
}

impl Command {
    /// Decode one received byte. `None` for anything outside the protocol.
    pub const fn decode(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Self::Play),
            b'C' => Some(Self::Pause),
            _ => match LedPattern::from_byte(byte) {
                Some(pattern) => Some(Self::Pattern(pattern)),
                None => match LedSpeed::from_byte(byte) {
                    Some(speed) => Some(Self::Speed(speed)),
                    None => None,
                },
            },
        }
    }
}

/// Effect of a handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// Playback state change (possibly none).
    Playback(Transition),
    /// New LED selection.
    Leds(LedSelection),
}

/// Applies commands to playback control and the published LED selection.
pub struct CommandController<'a, T> {
    engine: PlaybackEngine<T>,
    leds: &'a LedPublisher,
}

impl<'a, T: SampleTimer> CommandController<'a, T> {
    /// Controller publishing LED changes to `leds`.
    pub fn new(engine: PlaybackEngine<T>, leds: &'a LedPublisher) -> Self {
        Self { engine, leds }
    }

    /// Current LED selection.
    pub fn leds(&self) -> LedSelection {
        self.leds.current()
    }

    /// Playback control.
    pub fn engine(&self) -> &PlaybackEngine<T> {
        &self.engine
    }

    /// Apply `command`. `sink` receives the silence sample on pause.
    pub fn handle<K: SampleSink>(
        &mut self,
        command: Command,
        sink: &mut K,
    ) -> Result<Effect, K::Error> {
        let effect = match command {
            Command::Play => Effect::Playback(self.engine.start()),
            Command::Pause => Effect::Playback(self.engine.stop(sink)?),
            Command::Pattern(pattern) => {
                let selection = LedSelection {
                    pattern,
                    ..self.leds.current()
                };
                self.leds.publish(selection);
                Effect::Leds(selection)
            }
            Command::Speed(speed) => {
                let selection = LedSelection {
                    speed,
                    ..self.leds.current()
                };
                self.leds.publish(selection);
                Effect::Leds(selection)
            }
        };
        #[cfg(feature = "defmt")]
        defmt::debug!("command {} -> {}", command, effect);
        Ok(effect)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::{MockSampleSink, MockTimer};
    use playback::PlaybackState;

    fn controller(leds: &LedPublisher) -> CommandController<'_, MockTimer> {
        CommandController::new(PlaybackEngine::new(MockTimer::new()), leds)
    }

    #[test]
    fn test_decode_protocol_bytes() {
        assert_eq!(Command::decode(b'B'), Some(Command::Play));
        assert_eq!(Command::decode(b'C'), Some(Command::Pause));
        assert_eq!(
            Command::decode(b'X'),
            Some(Command::Pattern(LedPattern::Checker))
        );
        assert_eq!(Command::decode(b'3'), Some(Command::Speed(LedSpeed::Fast)));
    }

    #[test]
    fn test_unknown_bytes_are_ignored() {
        for byte in [b'A', b'D', b'T', b'0', b'4', b'b', 0x00, 0xFF] {
            assert_eq!(Command::decode(byte), None, "byte {byte:#04x}");
        }
    }

    #[test]
    fn test_speed_cycles() {
        assert_eq!(LedSpeed::Slow.cycles_per_frame(), 20);
        assert_eq!(LedSpeed::Medium.cycles_per_frame(), 10);
        assert_eq!(LedSpeed::Fast.cycles_per_frame(), 5);
    }

    #[test]
    fn test_default_selection() {
        let leds = LedPublisher::new();
        let c = controller(&leds);
        assert_eq!(c.leds(), LedSelection::default());
        assert_eq!(c.leds().speed.cycles_per_frame(), 20);
    }

    #[test]
    fn test_publisher_round_trips_every_selection() {
        let leds = LedPublisher::new();
        for pattern in b"UVWXYZ".iter().filter_map(|&b| LedPattern::from_byte(b)) {
            for speed in b"123".iter().filter_map(|&b| LedSpeed::from_byte(b)) {
                let selection = LedSelection { pattern, speed };
                leds.publish(selection);
                assert_eq!(leds.current(), selection);
            }
        }
    }

    #[tokio::test]
    async fn test_led_command_wakes_reader() {
        let leds = LedPublisher::new();
        let mut c = controller(&leds);
        let mut sink = MockSampleSink::new();

        c.handle(Command::Pattern(LedPattern::Chase), &mut sink)
            .unwrap();

        let seen = leds.changed().await;
        assert_eq!(seen.pattern, LedPattern::Chase);
        assert_eq!(leds.current(), seen);
    }

    #[test]
    fn test_play_then_pause() {
        let leds = LedPublisher::new();
        let mut c = controller(&leds);
        let mut sink = MockSampleSink::new();

        assert_eq!(
            c.handle(Command::Play, &mut sink).unwrap(),
            Effect::Playback(Transition::Started)
        );
        assert_eq!(c.engine().state(), PlaybackState::Playing);
        assert!(c.engine().timer().is_enabled());

        assert_eq!(
            c.handle(Command::Pause, &mut sink).unwrap(),
            Effect::Playback(Transition::Stopped)
        );
        assert!(!c.engine().timer().is_enabled());
        assert_eq!(sink.samples(), &[0x80]);
    }

    #[test]
    fn test_repeated_commands_are_idempotent() {
        let leds = LedPublisher::new();
        let mut c = controller(&leds);
        let mut sink = MockSampleSink::new();

        assert_eq!(
            c.handle(Command::Pause, &mut sink).unwrap(),
            Effect::Playback(Transition::Unchanged)
        );
        assert!(sink.samples().is_empty());

        c.handle(Command::Play, &mut sink).unwrap();
        assert_eq!(
            c.handle(Command::Play, &mut sink).unwrap(),
            Effect::Playback(Transition::Unchanged)
        );
    }

    #[test]
    fn test_led_commands_leave_playback_alone() {
        let leds = LedPublisher::new();
        let mut c = controller(&leds);
        let mut sink = MockSampleSink::new();

        c.handle(Command::Pattern(LedPattern::Sweep), &mut sink)
            .unwrap();
        let effect = c
            .handle(Command::Speed(LedSpeed::Medium), &mut sink)
            .unwrap();

        assert_eq!(
            effect,
            Effect::Leds(LedSelection {
                pattern: LedPattern::Sweep,
                speed: LedSpeed::Medium,
            })
        );
        assert_eq!(leds.current().pattern, LedPattern::Sweep);
        assert_eq!(leds.current().speed, LedSpeed::Medium);
        assert_eq!(c.engine().state(), PlaybackState::Stopped);
        assert!(sink.samples().is_empty());
    }
}
