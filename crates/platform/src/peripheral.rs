//! Peripheral abstraction layer
//!
//! Per-peripheral interfaces for the three buses the slave board drives:
//! SPI (SD card), I²C (DAC) and the sample-rate timer. Register layouts and
//! bit positions live in the concrete implementations; nothing above this
//! module sees an address or a control-register bit.

/// Byte clocked out when the host only wants to receive.
pub const SPI_FILLER: u8 = 0xFF;

/// Full-duplex, byte-at-a-time SPI master.
///
/// Chip select is *not* part of this trait: the SD protocol needs to clock
/// bytes with the device deselected, so the storage driver owns its own
/// select line.
pub trait SpiTransport {
    /// Error type
    type Error: core::fmt::Debug;

    /// Shift `byte` out and return the byte shifted in during the same clocks.
    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error>;

    /// Shift `byte` out, discarding whatever came back.
    fn send(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.transfer(byte).map(|_| ())
    }

    /// Clock in one byte by sending [`SPI_FILLER`].
    fn receive(&mut self) -> Result<u8, Self::Error> {
        self.transfer(SPI_FILLER)
    }

    /// Change the SCK divider. Takes effect from the next transfer.
    fn set_clock_divider(&mut self, divider: ClockDivider) -> Result<(), Self::Error>;

    /// Change the SCK divider to the supported one closest to `divisor` and
    /// return the divider applied.
    fn set_clock_divisor(&mut self, divisor: u32) -> Result<ClockDivider, Self::Error> {
        let divider = ClockDivider::nearest(divisor);
        self.set_clock_divider(divider).map(|()| divider)
    }
}

/// Supported SPI clock dividers (kernel clock / N).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockDivider {
    /// kernel / 2
    Div2,
    /// kernel / 4
    Div4,
    /// kernel / 8
    Div8,
    /// kernel / 16
    Div16,
    /// kernel / 32
    Div32,
    /// kernel / 64
    Div64,
    /// kernel / 128
    Div128,
}

impl ClockDivider {
    /// Every supported divider, fastest first.
    pub const ALL: [Self; 7] = [
        Self::Div2,
        Self::Div4,
        Self::Div8,
        Self::Div16,
        Self::Div32,
        Self::Div64,
        Self::Div128,
    ];

    /// The integer divisor this variant represents.
    pub const fn divisor(self) -> u32 {
        match self {
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div32 => 32,
            Self::Div64 => 64,
            Self::Div128 => 128,
        }
    }

    /// Exact match for `divisor`, if it is supported.
    pub fn from_divisor(divisor: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.divisor() == divisor)
    }

    /// Closest supported divider to `divisor`.
    ///
    /// Unsupported values never fail. When two dividers are equally close the
    /// larger one (slower clock) wins, since an SD card tolerates a slow bus
    /// but not one above its limit.
    pub fn nearest(divisor: u32) -> Self {
        if let Some(exact) = Self::from_divisor(divisor) {
            return exact;
        }
        let mut best = Self::Div2;
        let mut best_distance = u32::MAX;
        for candidate in Self::ALL {
            let distance = candidate.divisor().abs_diff(divisor);
            if distance <= best_distance {
                best = candidate;
                best_distance = distance;
            }
        }
        best
    }

    /// Resulting SCK frequency for a given peripheral kernel clock.
    pub const fn frequency_hz(self, kernel_hz: u32) -> u32 {
        match kernel_hz.checked_div(self.divisor()) {
            Some(hz) => hz,
            None => 0,
        }
    }
}

/// Byte-level I²C master: the caller frames the transaction itself.
///
/// The first byte written after [`start`](Self::start) is the address byte
/// (7-bit address shifted left, R/W̅ in bit 0).
pub trait I2cTransport {
    /// Error type
    type Error: core::fmt::Debug;

    /// Issue a START condition.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Write one byte and wait for the bus to report it sent.
    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Issue a STOP condition.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// Fixed-rate interrupt source that paces sample output.
///
/// The period is fixed at configuration time; only the interrupt enable is
/// controlled at runtime.
pub trait SampleTimer {
    /// Unmask the sample interrupt.
    fn enable(&mut self);

    /// Mask the sample interrupt. No further ticks are delivered after return.
    fn disable(&mut self);

    /// Whether the interrupt is currently unmasked.
    fn is_enabled(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_divisors_round_trip() {
        for divider in ClockDivider::ALL {
            assert_eq!(ClockDivider::from_divisor(divider.divisor()), Some(divider));
            assert_eq!(ClockDivider::nearest(divider.divisor()), divider);
        }
    }

    #[test]
    fn unsupported_divisor_falls_back_to_nearest() {
        assert_eq!(ClockDivider::from_divisor(100), None);
        assert_eq!(ClockDivider::nearest(100), ClockDivider::Div128);
        assert_eq!(ClockDivider::nearest(20), ClockDivider::Div16);
        assert_eq!(ClockDivider::nearest(0), ClockDivider::Div2);
        assert_eq!(ClockDivider::nearest(u32::MAX), ClockDivider::Div128);
    }

    #[test]
    fn ties_pick_the_slower_clock() {
        // 3 is one away from both 2 and 4.
        assert_eq!(ClockDivider::nearest(3), ClockDivider::Div4);
        // 48 is sixteen away from both 32 and 64.
        assert_eq!(ClockDivider::nearest(48), ClockDivider::Div64);
    }

    #[test]
    fn set_clock_divisor_applies_nearest_divider() {
        let mut spi = crate::mocks::SimulatedCard::new();
        assert_eq!(spi.set_clock_divisor(128), Ok(ClockDivider::Div128));
        assert_eq!(spi.set_clock_divisor(6), Ok(ClockDivider::Div8));
        assert_eq!(spi.set_clock_divisor(1000), Ok(ClockDivider::Div128));
        assert_eq!(
            spi.divider_history(),
            &[ClockDivider::Div128, ClockDivider::Div8, ClockDivider::Div128]
        );
    }

    #[test]
    fn frequency_follows_divisor() {
        assert_eq!(ClockDivider::Div4.frequency_hz(16_000_000), 4_000_000);
        assert_eq!(ClockDivider::Div128.frequency_hz(16_000_000), 125_000);
    }
}
