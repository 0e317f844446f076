//! SD card driver over a byte-level SPI transport
//!
//! Brings a card from power-up into SPI mode and serves windowed reads of
//! single 512-byte blocks. The driver owns the chip-select line because the
//! wake-up sequence has to clock bytes with the card deselected.
//!
//! Every wait is bounded by a [`RetryBudget`](platform::RetryBudget) from
//! [`platform::config`]: a card that never answers produces an error, not a
//! hang. Chip select is released on every exit path.

use embedded_hal::digital::OutputPin;
use platform::config::{
    SD_FAST_DIVISOR, SD_IDENT_DIVISOR, SD_RESPONSE_POLLS, SD_TIMEOUT_POLLS, SD_WAKE_FILLER_BYTES,
};
use platform::{
    BlockDevice, CardInfo, CardKind, CardState, InitError, IoError, ReadWindow, SpiTransport,
    CRC_BYTES,
};

use super::command::{
    Command, DATA_START_TOKEN, HOST_CAPACITY_SUPPORT, IF_COND_ARGUMENT, IF_COND_CHECK_PATTERN,
    OCR_CCS, R1_IDLE, R1_NONE, R1_READY,
};

/// Transport or select-line failure, before it is mapped to the caller's
/// error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BusFault;

impl From<BusFault> for InitError {
    fn from(_: BusFault) -> Self {
        Self::Bus
    }
}

impl From<BusFault> for IoError {
    fn from(_: BusFault) -> Self {
        Self::Bus
    }
}

/// SD card in SPI mode.
pub struct SdCard<S, CS> {
    spi: S,
    cs: CS,
    state: CardState,
}

impl<S: SpiTransport, CS: OutputPin> SdCard<S, CS> {
    /// Wrap a transport and its select line. Nothing is sent until
    /// [`initialize`](Self::initialize).
    pub fn new(spi: S, cs: CS) -> Self {
        Self {
            spi,
            cs,
            state: CardState::Uninitialized,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CardState {
        self.state
    }

    /// The underlying transport.
    pub fn transport(&self) -> &S {
        &self.spi
    }

    /// Give back the transport and select line.
    pub fn release(self) -> (S, CS) {
        (self.spi, self.cs)
    }

    /// Run the power-up sequence.
    ///
    /// On success the bus is switched to [`SD_FAST_DIVISOR`]. On failure the
    /// card is left in [`CardState::Failed`] and the bus stays at the
    /// identification speed.
    pub fn initialize(&mut self) -> Result<CardInfo, InitError> {
        let identified = self.identify();
        let released = self.deselect().map_err(InitError::from);

        let kind = match identified.and_then(|kind| released.map(|()| kind)) {
            Ok(kind) => kind,
            Err(e) => {
                self.state = CardState::Failed;
                #[cfg(feature = "defmt")]
                defmt::error!("SD init failed: {}", e);
                return Err(e);
            }
        };

        let Ok(bus_divider) = self.spi.set_clock_divisor(SD_FAST_DIVISOR) else {
            self.state = CardState::Failed;
            return Err(InitError::Bus);
        };
        self.state = CardState::Idle(kind);

        #[cfg(feature = "defmt")]
        defmt::info!("SD card ready: {}", kind);

        Ok(CardInfo {
            kind,
            bus_divider,
        })
    }

    /// Steps 1-5 of the power-up sequence. Leaves the card selected.
    fn identify(&mut self) -> Result<CardKind, InitError> {
        self.spi
            .set_clock_divisor(SD_IDENT_DIVISOR)
            .map_err(|_| InitError::Bus)?;

        // At least 74 clocks with CS high before the first command.
        self.deselect()?;
        for _ in 0..SD_WAKE_FILLER_BYTES {
            self.spi.send(R1_NONE).map_err(|_| InitError::Bus)?;
        }
        self.select()?;

        if self.command(Command::GoIdleState, 0)? != R1_IDLE {
            return Err(InitError::NotResponding);
        }

        if self.command(Command::SendIfCond, IF_COND_ARGUMENT)? != R1_IDLE {
            return Err(InitError::UnsupportedCard);
        }
        let mut r7 = [0u8; 4];
        self.receive_into(&mut r7)?;
        if r7[3] != IF_COND_CHECK_PATTERN {
            return Err(InitError::VoltageCheckFailed);
        }

        let ready = SD_TIMEOUT_POLLS.poll(|| -> Result<Option<()>, BusFault> {
            // The CMD55 response carries nothing the loop needs.
            self.command(Command::AppCmd, 0)?;
            let r1 = self.command(Command::SdSendOpCond, HOST_CAPACITY_SUPPORT)?;
            Ok((r1 == R1_READY).then_some(()))
        })?;
        if ready.is_none() {
            return Err(InitError::Timeout);
        }

        if self.command(Command::ReadOcr, 0)? != R1_READY {
            #[cfg(feature = "defmt")]
            defmt::warn!("CMD58 rejected, assuming standard capacity");
            return Ok(CardKind::Standard);
        }
        let mut ocr = [0u8; 4];
        self.receive_into(&mut ocr)?;
        Ok(if ocr[0] & OCR_CCS != 0 {
            CardKind::HighCapacity
        } else {
            CardKind::Standard
        })
    }

    /// CMD17 and payload transfer. Assumes the card is selected.
    fn read_window(
        &mut self,
        address: u32,
        window: ReadWindow,
        buffer: &mut [u8],
    ) -> Result<(), IoError> {
        if self.command(Command::ReadSingleBlock, address)? != R1_READY {
            return Err(IoError::CommandRejected);
        }

        let token = SD_TIMEOUT_POLLS.poll(|| -> Result<Option<()>, BusFault> {
            let byte = self.spi.receive().map_err(|_| BusFault)?;
            Ok((byte == DATA_START_TOKEN).then_some(()))
        })?;
        if token.is_none() {
            return Err(IoError::DataTokenTimeout);
        }

        self.discard(window.offset())?;
        let dest = buffer
            .get_mut(window.offset()..window.end())
            .ok_or(IoError::OffsetOutOfRange)?;
        self.receive_into(dest)?;
        #[allow(clippy::arithmetic_side_effects)] // Safety: trailing() <= 512
        self.discard(window.trailing() + CRC_BYTES)?;
        Ok(())
    }

    /// Send a command frame and poll for its R1. [`R1_NONE`] if the card
    /// stayed silent.
    fn command(&mut self, command: Command, argument: u32) -> Result<u8, BusFault> {
        for byte in command.frame(argument) {
            self.spi.send(byte).map_err(|_| BusFault)?;
        }
        let spi = &mut self.spi;
        let r1 = SD_RESPONSE_POLLS.poll(|| -> Result<Option<u8>, BusFault> {
            let byte = spi.receive().map_err(|_| BusFault)?;
            Ok((byte != R1_NONE).then_some(byte))
        })?;
        Ok(r1.unwrap_or(R1_NONE))
    }

    fn receive_into(&mut self, dest: &mut [u8]) -> Result<(), BusFault> {
        for slot in dest {
            *slot = self.spi.receive().map_err(|_| BusFault)?;
        }
        Ok(())
    }

    fn discard(&mut self, count: usize) -> Result<(), BusFault> {
        for _ in 0..count {
            self.spi.receive().map_err(|_| BusFault)?;
        }
        Ok(())
    }

    fn select(&mut self) -> Result<(), BusFault> {
        self.cs.set_low().map_err(|_| BusFault)
    }

    fn deselect(&mut self) -> Result<(), BusFault> {
        self.cs.set_high().map_err(|_| BusFault)
    }
}

impl<S: SpiTransport, CS: OutputPin> BlockDevice for SdCard<S, CS> {
    fn read_partial(
        &mut self,
        block: u32,
        buffer: &mut [u8],
        offset: u16,
        length: u16,
    ) -> Result<(), IoError> {
        let window = ReadWindow::new(offset, length, buffer.len())?;
        let CardState::Idle(kind) = self.state else {
            return Err(IoError::CardNotReady);
        };
        let address = kind.wire_address(block).ok_or(IoError::BlockOutOfRange)?;

        self.select()?;
        let result = self.read_window(address, window, buffer);
        let released = self.deselect();
        result?;
        released?;
        Ok(())
    }
}
