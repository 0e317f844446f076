//! Sample-rate timer
//!
//! The sample period is defined by the AVR-style clear-on-match timer in
//! [`platform::config`]: `SAMPLE_TIMER_COMPARE + 1` ticks of a 16 MHz clock.
//! On the STM32H7, TIM3 reproduces that period from its own kernel clock
//! with prescaler 0 and a computed auto-reload value.
//!
//! The counter runs continuously once programmed; [`SampleTimer::enable`]
//! and [`SampleTimer::disable`] only gate the update interrupt, so stopping
//! and restarting playback never shifts the sample phase by more than one
//! period.
//!
//! [`SampleTimer::enable`]: platform::SampleTimer::enable
//! [`SampleTimer::disable`]: platform::SampleTimer::disable

use platform::config::{SAMPLE_TIMER_COMPARE, TIMER_CLOCK_HZ};

/// TIM3 kernel clock: APB1 (100 MHz) doubled because its prescaler is /2.
pub const TIMER_KERNEL_HZ: u32 = 200_000_000;

/// Auto-reload value giving the configured sample period at `kernel_hz`,
/// rounded to the nearest tick. `None` if it does not fit a 16-bit timer.
pub const fn auto_reload(kernel_hz: u32) -> Option<u16> {
    let period = SAMPLE_TIMER_COMPARE as u64 + 1;
    let Some(scaled) = period.checked_mul(kernel_hz as u64) else {
        return None;
    };
    let Some(half) = (TIMER_CLOCK_HZ as u64).checked_div(2) else {
        return None;
    };
    let Some(rounded) = scaled.checked_add(half) else {
        return None;
    };
    let Some(ticks) = rounded.checked_div(TIMER_CLOCK_HZ as u64) else {
        return None;
    };
    let Some(reload) = ticks.checked_sub(1) else {
        return None;
    };
    if reload > u16::MAX as u64 {
        None
    } else {
        Some(reload as u16)
    }
}

#[cfg(feature = "hardware")]
pub mod hardware {
    //! TIM3 register access. Only compiled for the target.

    use embassy_stm32::pac;
    use platform::SampleTimer;

    /// TIM3 as the sample clock.
    pub struct Tim3SampleTimer {
        _private: (),
    }

    impl Tim3SampleTimer {
        /// Clock TIM3, program the period and start counting with the
        /// update interrupt masked.
        pub fn new(reload: u16) -> Self {
            pac::RCC.apb1lenr().modify(|w| w.set_tim3en(true));

            let tim = pac::TIM3;
            tim.cr1().modify(|w| w.set_cen(false));
            tim.dier().modify(|w| w.set_uie(false));
            tim.psc().write(|w| w.set_psc(0));
            tim.arr().write(|w| w.set_arr(reload));
            // Latch PSC/ARR, then drop the update flag the latch raised.
            tim.egr().write(|w| w.set_ug(true));
            tim.sr().modify(|w| w.set_uif(false));
            tim.cr1().modify(|w| w.set_cen(true));

            defmt::info!("TIM3 sample clock: ARR={=u16}", reload);
            Self { _private: () }
        }
    }

    impl SampleTimer for Tim3SampleTimer {
        fn enable(&mut self) {
            pac::TIM3.sr().modify(|w| w.set_uif(false));
            pac::TIM3.dier().modify(|w| w.set_uie(true));
        }

        fn disable(&mut self) {
            pac::TIM3.dier().modify(|w| w.set_uie(false));
        }

        fn is_enabled(&self) -> bool {
            pac::TIM3.dier().read().uie()
        }
    }

    /// Clear the pending update flag. Call first thing in the TIM3 handler.
    pub fn acknowledge_update() {
        pac::TIM3.sr().modify(|w| w.set_uif(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_reproduces_reference_period() {
        // 2902 ticks at 16 MHz = 36275 ticks at 200 MHz.
        assert_eq!(auto_reload(TIMER_KERNEL_HZ), Some(36_274));
    }

    #[test]
    fn test_reload_at_reference_clock_is_compare_value() {
        assert_eq!(auto_reload(TIMER_CLOCK_HZ), Some(SAMPLE_TIMER_COMPARE));
    }

    #[test]
    fn test_reload_overflow_is_rejected() {
        assert_eq!(auto_reload(400_000_000), None);
        assert_eq!(auto_reload(0), None);
    }
}
