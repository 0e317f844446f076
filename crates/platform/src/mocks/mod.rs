//! Mock implementations for testing
//!
//! Host-side stand-ins for every platform trait the slave board uses, plus a
//! behavioural SD card model that speaks the SPI-mode command protocol.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]

use std::boxed::Box;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use crate::audio::SampleSink;
use crate::peripheral::{ClockDivider, SampleTimer, SpiTransport};
use crate::storage::{CardKind, BLOCK_SIZE};

// ── Sample sink ─────────────────────────────────────────────────────────────

/// Error returned by [`MockSampleSink`] once told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSinkError;

/// Records every sample written to it.
#[derive(Debug, Default)]
pub struct MockSampleSink {
    samples: Vec<u8>,
    fail_writes: bool,
    failures: usize,
}

impl MockSampleSink {
    /// Create new recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples accepted so far, in order.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Most recent accepted sample.
    pub fn last(&self) -> Option<u8> {
        self.samples.last().copied()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of rejected writes.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Forget recorded samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl SampleSink for MockSampleSink {
    type Error = MockSinkError;

    fn write_sample(&mut self, value: u8) -> Result<(), Self::Error> {
        if self.fail_writes {
            self.failures += 1;
            return Err(MockSinkError);
        }
        self.samples.push(value);
        Ok(())
    }
}

// ── Sample timer ────────────────────────────────────────────────────────────

/// Timer that only tracks its interrupt-enable state.
#[derive(Debug, Default)]
pub struct MockTimer {
    enabled: bool,
    enables: usize,
    disables: usize,
}

impl MockTimer {
    /// Create a disabled timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `enable` calls.
    pub fn enable_count(&self) -> usize {
        self.enables
    }

    /// Number of `disable` calls.
    pub fn disable_count(&self) -> usize {
        self.disables
    }
}

impl SampleTimer for MockTimer {
    fn enable(&mut self) {
        self.enabled = true;
        self.enables += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.disables += 1;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// ── Chip select ─────────────────────────────────────────────────────────────

/// Active-low select line wired to a [`SimulatedCard`].
#[derive(Debug, Clone)]
pub struct MockChipSelect {
    selected: Rc<Cell<bool>>,
}

impl MockChipSelect {
    /// Whether the line is currently driven low.
    pub fn is_selected(&self) -> bool {
        self.selected.get()
    }
}

impl embedded_hal::digital::ErrorType for MockChipSelect {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockChipSelect {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.selected.set(true);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.selected.set(false);
        Ok(())
    }
}

// ── Simulated SD card ───────────────────────────────────────────────────────

/// Knobs that make a [`SimulatedCard`] misbehave in specific ways.
#[derive(Debug, Clone, Copy)]
pub struct CardBehavior {
    /// Addressing mode reported through the OCR.
    pub kind: CardKind,
    /// Never answer CMD0.
    pub silent: bool,
    /// Answer CMD8 with "illegal command" (v1 / MMC card).
    pub reject_if_cond: bool,
    /// Echo a wrong check pattern from CMD8.
    pub wrong_echo: bool,
    /// ACMD41 rounds answered busy before the card reports ready.
    pub busy_rounds: u32,
    /// ACMD41 never reports ready.
    pub never_ready: bool,
    /// Answer CMD58 with an error response.
    pub reject_ocr: bool,
    /// Answer CMD17 with an error response.
    pub reject_reads: bool,
    /// Filler bytes before the data token.
    pub token_delay: usize,
    /// Never send the data token.
    pub withhold_token: bool,
}

impl Default for CardBehavior {
    fn default() -> Self {
        Self {
            kind: CardKind::HighCapacity,
            silent: false,
            reject_if_cond: false,
            wrong_echo: false,
            busy_rounds: 3,
            never_ready: false,
            reject_ocr: false,
            reject_reads: false,
            token_delay: 2,
            withhold_token: false,
        }
    }
}

/// Command frame seen by a [`SimulatedCard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeenCommand {
    /// Command index (0..=63).
    pub index: u8,
    /// 32-bit argument.
    pub argument: u32,
    /// Trailing CRC/stop byte.
    pub crc: u8,
}

type BlockContent = Box<dyn Fn(u32, usize) -> u8>;

/// Behavioural model of an SD card in SPI mode.
///
/// Implements [`SpiTransport`] directly; pair it with the
/// [`MockChipSelect`] from [`chip_select`](Self::chip_select). Bytes clocked
/// while deselected are counted but otherwise ignored.
pub struct SimulatedCard {
    behavior: CardBehavior,
    content: BlockContent,
    selected: Rc<Cell<bool>>,
    frame: Vec<u8>,
    outgoing: VecDeque<u8>,
    app_command: bool,
    busy_left: u32,
    commands: Vec<SeenCommand>,
    transfers: usize,
    deselected_transfers: usize,
    dividers: Vec<ClockDivider>,
    read_addresses: Vec<u32>,
}

/// Default card content: byte `i` of block `b` is `(b + i) mod 256`.
pub fn block_pattern(block: u32, index: usize) -> u8 {
    (block as usize).wrapping_add(index) as u8
}

impl SimulatedCard {
    /// Well-behaved high-capacity card holding [`block_pattern`].
    pub fn new() -> Self {
        Self::with_behavior(CardBehavior::default())
    }

    /// Card with the given quirks.
    pub fn with_behavior(behavior: CardBehavior) -> Self {
        Self {
            behavior,
            content: Box::new(block_pattern),
            selected: Rc::new(Cell::new(false)),
            frame: Vec::new(),
            outgoing: VecDeque::new(),
            app_command: false,
            busy_left: behavior.busy_rounds,
            commands: Vec::new(),
            transfers: 0,
            deselected_transfers: 0,
            dividers: Vec::new(),
            read_addresses: Vec::new(),
        }
    }

    /// Replace the block content generator.
    pub fn with_content(mut self, content: impl Fn(u32, usize) -> u8 + 'static) -> Self {
        self.content = Box::new(content);
        self
    }

    /// Select line connected to this card.
    pub fn chip_select(&self) -> MockChipSelect {
        MockChipSelect {
            selected: Rc::clone(&self.selected),
        }
    }

    /// Whether the select line is currently low.
    pub fn is_selected(&self) -> bool {
        self.selected.get()
    }

    /// Every complete command frame received, in order.
    pub fn commands(&self) -> &[SeenCommand] {
        &self.commands
    }

    /// Command indices received, in order.
    pub fn command_indices(&self) -> Vec<u8> {
        self.commands.iter().map(|c| c.index).collect()
    }

    /// Total bytes clocked, selected or not.
    pub fn transfer_count(&self) -> usize {
        self.transfers
    }

    /// Bytes clocked while deselected.
    pub fn deselected_transfer_count(&self) -> usize {
        self.deselected_transfers
    }

    /// Every divider the host programmed, in order.
    pub fn divider_history(&self) -> &[ClockDivider] {
        &self.dividers
    }

    /// Wire addresses received with CMD17, in order.
    pub fn read_addresses(&self) -> &[u32] {
        &self.read_addresses
    }

    fn block_for_address(&self, address: u32) -> u32 {
        match self.behavior.kind {
            CardKind::Standard => address / BLOCK_SIZE as u32,
            CardKind::HighCapacity => address,
        }
    }

    fn respond(&mut self, bytes: &[u8]) {
        // One NCR filler byte always precedes R1.
        self.outgoing.push_back(0xFF);
        self.outgoing.extend(bytes.iter().copied());
    }

    fn execute(&mut self, command: SeenCommand) {
        self.commands.push(command);
        let app = core::mem::take(&mut self.app_command);
        match (app, command.index) {
            (_, 0) => {
                if self.behavior.silent {
                    return;
                }
                self.busy_left = self.behavior.busy_rounds;
                self.respond(&[0x01]);
            }
            (_, 8) => {
                if self.behavior.reject_if_cond {
                    self.respond(&[0x05]);
                } else {
                    let echo = if self.behavior.wrong_echo {
                        0x55
                    } else {
                        command.argument.to_be_bytes()[3]
                    };
                    self.respond(&[0x01, 0x00, 0x00, 0x01, echo]);
                }
            }
            (_, 55) => {
                self.app_command = true;
                self.respond(&[0x01]);
            }
            (true, 41) => {
                if self.behavior.never_ready || self.busy_left > 0 {
                    self.busy_left = self.busy_left.saturating_sub(1);
                    self.respond(&[0x01]);
                } else {
                    self.respond(&[0x00]);
                }
            }
            (_, 58) => {
                if self.behavior.reject_ocr {
                    self.respond(&[0x05]);
                } else {
                    let ccs = match self.behavior.kind {
                        CardKind::HighCapacity => 0xC0,
                        CardKind::Standard => 0x80,
                    };
                    self.respond(&[0x00, ccs, 0xFF, 0x80, 0x00]);
                }
            }
            (_, 17) => {
                self.read_addresses.push(command.argument);
                if self.behavior.reject_reads {
                    self.respond(&[0x04]);
                    return;
                }
                self.respond(&[0x00]);
                self.outgoing
                    .extend(core::iter::repeat(0xFF).take(self.behavior.token_delay));
                if self.behavior.withhold_token {
                    return;
                }
                self.outgoing.push_back(0xFE);
                let block = self.block_for_address(command.argument);
                for i in 0..BLOCK_SIZE {
                    let byte = (self.content)(block, i);
                    self.outgoing.push_back(byte);
                }
                // CRC16, not checked in SPI mode.
                self.outgoing.extend([0xA5, 0x5A]);
            }
            _ => self.respond(&[0x04]),
        }
    }
}

impl Default for SimulatedCard {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SimulatedCard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulatedCard")
            .field("behavior", &self.behavior)
            .field("selected", &self.selected.get())
            .field("commands", &self.commands.len())
            .field("transfers", &self.transfers)
            .finish_non_exhaustive()
    }
}

impl SpiTransport for SimulatedCard {
    type Error = core::convert::Infallible;

    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error> {
        self.transfers += 1;
        if !self.selected.get() {
            self.deselected_transfers += 1;
            return Ok(0xFF);
        }
        if !self.frame.is_empty() {
            self.frame.push(byte);
            if self.frame.len() == 6 {
                let f = core::mem::take(&mut self.frame);
                let command = SeenCommand {
                    index: f[0] & 0x3F,
                    argument: u32::from_be_bytes([f[1], f[2], f[3], f[4]]),
                    crc: f[5],
                };
                self.execute(command);
            }
            return Ok(0xFF);
        }
        if byte & 0xC0 == 0x40 {
            // A new command aborts whatever response was still pending.
            self.outgoing.clear();
            self.frame.push(byte);
            return Ok(0xFF);
        }
        Ok(self.outgoing.pop_front().unwrap_or(0xFF))
    }

    fn set_clock_divider(&mut self, divider: ClockDivider) -> Result<(), Self::Error> {
        self.dividers.push(divider);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_hal::digital::OutputPin;

    fn clock_command(card: &mut SimulatedCard, frame: [u8; 6]) -> Vec<u8> {
        for b in frame {
            card.transfer(b).unwrap();
        }
        (0..8).map(|_| card.receive().unwrap()).collect()
    }

    #[test]
    fn sink_records_and_fails_on_demand() {
        let mut sink = MockSampleSink::new();
        sink.write_sample(1).unwrap();
        sink.set_failing(true);
        assert_eq!(sink.write_sample(2), Err(MockSinkError));
        assert_eq!(sink.samples(), &[1]);
        assert_eq!(sink.failures(), 1);
    }

    #[test]
    fn timer_tracks_enable_state() {
        let mut timer = MockTimer::new();
        assert!(!timer.is_enabled());
        timer.enable();
        assert!(timer.is_enabled());
        timer.disable();
        assert!(!timer.is_enabled());
        assert_eq!((timer.enable_count(), timer.disable_count()), (1, 1));
    }

    #[test]
    fn card_ignores_traffic_while_deselected() {
        let mut card = SimulatedCard::new();
        let response = clock_command(&mut card, [0x40, 0, 0, 0, 0, 0x95]);
        assert!(response.iter().all(|&b| b == 0xFF));
        assert!(card.commands().is_empty());
        assert_eq!(card.deselected_transfer_count(), 14);
    }

    #[test]
    fn card_answers_go_idle_after_ncr_byte() {
        let mut card = SimulatedCard::new();
        card.chip_select().set_low().unwrap();
        let response = clock_command(&mut card, [0x40, 0, 0, 0, 0, 0x95]);
        assert_eq!(&response[..2], &[0xFF, 0x01]);
        assert_eq!(card.command_indices(), vec![0]);
        assert_eq!(card.commands()[0].crc, 0x95);
    }

    #[test]
    fn standard_card_reads_by_byte_address() {
        let mut card = SimulatedCard::with_behavior(CardBehavior {
            kind: CardKind::Standard,
            token_delay: 0,
            ..CardBehavior::default()
        });
        card.chip_select().set_low().unwrap();
        // Block 3 at byte address 1536 = 0x600.
        for b in [0x51, 0x00, 0x00, 0x06, 0x00, 0xFF] {
            card.transfer(b).unwrap();
        }
        assert_eq!(card.receive().unwrap(), 0xFF);
        assert_eq!(card.receive().unwrap(), 0x00);
        assert_eq!(card.receive().unwrap(), 0xFE);
        assert_eq!(card.receive().unwrap(), block_pattern(3, 0));
        assert_eq!(card.read_addresses(), &[1536]);
    }
}
