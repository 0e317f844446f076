//! Boot sequence for the pinball audio slave.
//!
//! Initialization order (MUST be respected):
//!   1. Clocks, so SPI1 / I2C1 / TIM3 kernel frequencies are known
//!   2. Watchdog, before anything that polls external hardware
//!   3. SD card identification; a failure parks the board
//!   4. DAC parked at mid-scale
//!   5. Sample timer programmed with its interrupt masked
//!   6. Settle period for the master board
//!   7. Both ring halves preloaded from the first asset block
//!   8. Refill producer and serial command tasks spawned
//!
//! Playback always comes up `Stopped`; the master starts it with `B`.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use platform::config::STARTUP_SETTLE_MS;
use platform::{CardInfo, InitError, IoError, SpiTransport};
use playback::Producer;
use thiserror_no_std::Error;

use crate::audio::dac::DacDriver;
use crate::sd::SdCard;

/// Ordered list of boot steps, mirrored by `main`.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. RCC: HSI → PLL1 400 MHz, APB 100 MHz, PLL1Q 50 MHz for SPI1",
    "2. IWDG: arm before any bounded-poll bring-up",
    "3. SD: identify at /128 (390 kHz), switch to /4 (fatal on failure)",
    "4. DAC: MCP4725 parked at mid-scale",
    "5. TIM3: sample period programmed, update interrupt masked",
    "6. Settle: wait for the master board",
    "7. Preload: lower then upper half from the first asset block",
    "8. Tasks: spawn refill producer and serial command handler",
];

/// IWDG timeout. Must exceed [`STARTUP_SETTLE_MS`] because the watchdog is
/// only fed before and after the settle wait.
pub const WATCHDOG_TIMEOUT_MS: u32 = 8_000;

/// IWDG timeout in the unit `IndependentWatchdog::new` expects.
#[allow(clippy::arithmetic_side_effects)] // Safety: 8_000 * 1_000 fits in u32
pub const WATCHDOG_TIMEOUT_US: u32 = WATCHDOG_TIMEOUT_MS * 1_000;

/// Fatal boot failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    /// The SD card could not be brought up; there is nothing to play.
    #[error("storage initialization failed")]
    Storage(InitError),
}

impl From<InitError> for BootError {
    fn from(e: InitError) -> Self {
        Self::Storage(e)
    }
}

/// What the non-fatal steps reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootReport {
    /// Card identified in step 3.
    pub card: CardInfo,
    /// Whether the DAC accepted its mid-scale write.
    pub dac_ready: bool,
    /// Preload failure, if any. Playback can still be started; the
    /// affected half plays whatever the ring held.
    pub preload_error: Option<IoError>,
}

/// Bring up storage first, return early on failure.
pub fn bring_up_storage<S, CS>(card: &mut SdCard<S, CS>) -> Result<CardInfo, BootError>
where
    S: SpiTransport,
    CS: OutputPin,
{
    Ok(card.initialize()?)
}

/// Steps 3, 4, 6 and 7. Timer setup (step 5) is target-specific and done by
/// the caller before awaiting this.
pub async fn bring_up<S, CS, D, W>(
    card: &mut SdCard<S, CS>,
    dac: &mut D,
    producer: &mut Producer<'_>,
    delay: &mut W,
) -> Result<BootReport, BootError>
where
    S: SpiTransport,
    CS: OutputPin,
    D: DacDriver,
    W: DelayNs,
{
    let info = bring_up_storage(card)?;

    let dac_ready = dac.init().is_ok();
    if !dac_ready {
        #[cfg(feature = "defmt")]
        defmt::warn!("DAC did not accept mid-scale write");
    }

    delay.delay_ms(STARTUP_SETTLE_MS).await;

    let preload_error = producer.preload(card).err();
    if let Some(_e) = preload_error {
        #[cfg(feature = "defmt")]
        defmt::warn!("preload failed: {}", _e);
    }

    Ok(BootReport {
        card: info,
        dac_ready,
        preload_error,
    })
}

// ── RCC clock configuration ───────────────────────────────────────────────────

/// Build the `embassy_stm32::Config` for the slave board.
///
/// # Clock Tree (HSI → 400 MHz core)
///
/// HSI (64 MHz) → PLL1 (prediv=4, mul=50) → PLL1_P = 400 MHz (sys)
/// AHB prescaler: DIV2 → 200 MHz
/// APB1/2/3/4:    DIV2 → 100 MHz
/// PLL1Q: DIV16 → 50 MHz  (SPI1 kernel via the default SPI123SEL mux,
///                         matches `platform::config::SPI_KERNEL_HZ`;
///                         /128 = 390 kHz identification, /4 = 12.5 MHz)
/// TIM3 kernel = 2 × APB1 = 200 MHz (timer clock doubling with APB /2)
/// I2C1 kernel = APB1 = 100 MHz
#[cfg(feature = "hardware")]
pub fn build_embassy_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc::*;

    let mut config = embassy_stm32::Config::default();

    config.rcc.hsi = Some(HSIPrescaler::DIV1);
    config.rcc.csi = true;

    // HSI (64 MHz) / prediv(4) = 16 MHz → × mul(50) = 800 MHz VCO
    config.rcc.pll1 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL50,
        divp: Some(PllDiv::DIV2), // 400 MHz system clock
        divq: Some(PllDiv::DIV16), // 50 MHz SPI1 kernel clock
        divr: None,
    });

    config.rcc.sys = Sysclk::PLL1_P; // 400 MHz
    config.rcc.ahb_pre = AHBPrescaler::DIV2; // 200 MHz
    config.rcc.apb1_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb2_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb3_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb4_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.voltage_scale = VoltageScale::Scale1;

    config
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::audio::dac::mock::MockDac;
    use platform::mocks::{block_pattern, CardBehavior, SimulatedCard};
    use platform::{CardKind, CardState};
    use playback::{AssetLayout, Half, Pipeline};

    /// Records requested delays without sleeping.
    #[derive(Default)]
    struct RecordingDelay {
        total_ns: u64,
    }

    impl DelayNs for RecordingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    fn card(behavior: CardBehavior) -> SdCard<SimulatedCard, platform::mocks::MockChipSelect> {
        let sim = SimulatedCard::with_behavior(behavior);
        let cs = sim.chip_select();
        SdCard::new(sim, cs)
    }

    #[test]
    fn test_watchdog_outlasts_settle() {
        assert!(WATCHDOG_TIMEOUT_MS > STARTUP_SETTLE_MS);
        assert_eq!(WATCHDOG_TIMEOUT_US, 8_000_000);
    }

    #[test]
    fn test_boot_steps_order_storage_before_preload() {
        let pos = |needle: &str| {
            BOOT_SEQUENCE_STEPS
                .iter()
                .position(|s| s.contains(needle))
                .unwrap()
        };
        assert!(pos("SD:") < pos("DAC:"));
        assert!(pos("Settle") < pos("Preload"));
        assert!(pos("Preload") < pos("Tasks"));
    }

    #[tokio::test]
    async fn test_bring_up_preloads_first_block() {
        let pipeline = Pipeline::new();
        let mut producer = Producer::new(&pipeline, AssetLayout::MUSIC);
        let mut sd = card(CardBehavior::default());
        let mut dac = MockDac::new();
        let mut delay = RecordingDelay::default();

        let report = bring_up(&mut sd, &mut dac, &mut producer, &mut delay)
            .await
            .unwrap();

        assert_eq!(report.card.kind, CardKind::HighCapacity);
        assert!(report.dac_ready);
        assert_eq!(report.preload_error, None);
        assert_eq!(dac.sink.samples(), &[0x80]);
        assert_eq!(delay.total_ns, u64::from(STARTUP_SETTLE_MS) * 1_000_000);

        let ring = pipeline.ring();
        assert!(ring.is_ready(Half::Lower));
        assert!(ring.is_ready(Half::Upper));
        assert_eq!(ring.sample(0), block_pattern(100, 0));
        assert_eq!(ring.sample(399), block_pattern(100, 399));
        assert_eq!(producer.cursor().position(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_fatal() {
        let pipeline = Pipeline::new();
        let mut producer = Producer::new(&pipeline, AssetLayout::MUSIC);
        let mut sd = card(CardBehavior {
            reject_if_cond: true,
            ..CardBehavior::default()
        });
        let mut dac = MockDac::new();
        let mut delay = RecordingDelay::default();

        let err = bring_up(&mut sd, &mut dac, &mut producer, &mut delay)
            .await
            .unwrap_err();

        assert_eq!(err, BootError::Storage(InitError::UnsupportedCard));
        assert_eq!(sd.state(), CardState::Failed);
        assert_eq!(dac.init_count, 0);
        assert_eq!(delay.total_ns, 0);
    }

    #[tokio::test]
    async fn test_preload_failure_is_reported_not_fatal() {
        let pipeline = Pipeline::new();
        let mut producer = Producer::new(&pipeline, AssetLayout::MUSIC);
        let mut sd = card(CardBehavior {
            reject_reads: true,
            ..CardBehavior::default()
        });
        let mut dac = MockDac::new();
        let mut delay = RecordingDelay::default();

        let report = bring_up(&mut sd, &mut dac, &mut producer, &mut delay)
            .await
            .unwrap();

        assert_eq!(report.preload_error, Some(IoError::CommandRejected));
        assert_eq!(pipeline.snapshot().read_errors, 1);
        assert_eq!(producer.cursor().position(), 0);
    }
}
