//! Pinball audio slave - Main Entry Point
//!
//! Hardware-only entry point for STM32H743ZI.
//!
//! Pin assignments:
//!   PA5 / PA7 / PA6 = SPI1 SCK / MOSI / MISO (SD card)
//!   PA4             = SD chip select (active low)
//!   PB8 / PB9       = I2C1 SCL / SDA (MCP4725)
//!   PD8 / PD9       = USART3 TX / RX (master board link)

#![no_std]
#![no_main]

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_executor::Spawner;
use embassy_stm32::dma::NoDma;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::peripherals::{
    self, DMA1_CH0, DMA1_CH1, DMA1_CH2, DMA1_CH3, I2C1, IWDG1, PA4, SPI1, USART3,
};
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{self, Config as UartConfig, Uart};
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_time::{Delay, Duration, Timer};

use firmware::audio::timer::hardware::{acknowledge_update, Tim3SampleTimer};
use firmware::audio::timer::{auto_reload, TIMER_KERNEL_HZ};
use firmware::boot::{self, WATCHDOG_TIMEOUT_MS, WATCHDOG_TIMEOUT_US};
use firmware::transport::spi::Stm32Spi;
use firmware::{BufferedI2c, Command, CommandController, LedPublisher, Mcp4725, SdCard};
use platform::config::{
    APP_NAME, APP_VERSION, DAC_I2C_ADDRESS, I2C_FREQUENCY_HZ, READY_BYTE, SD_IDENT_DIVISOR,
    SERIAL_BAUD, SPI_KERNEL_HZ,
};
use platform::ClockDivider;
use playback::{AssetLayout, Pipeline, PlaybackEngine, Producer, SampleConsumer};

// Panic handler
use panic_probe as _;
// Logger transport
use defmt_rtt as _;

embassy_stm32::bind_interrupts!(struct Irqs {
    I2C1_EV => i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER => i2c::ErrorInterruptHandler<peripherals::I2C1>;
    USART3 => usart::InterruptHandler<peripherals::USART3>;
});

type AudioDac = Mcp4725<BufferedI2c<I2c<'static, I2C1, NoDma, NoDma>>>;
type Card = SdCard<Stm32Spi<'static, SPI1, DMA1_CH0, DMA1_CH1>, Output<'static, PA4>>;
type Link = Uart<'static, USART3, DMA1_CH2, DMA1_CH3>;
type Watchdog = IndependentWatchdog<'static, IWDG1>;

/// Ring buffer, refill queue and counters shared by the ISR and the tasks.
static PIPELINE: Pipeline = Pipeline::new();

/// LED selection published for the matrix renderer.
static LEDS: LedPublisher = LedPublisher::new();

/// Sample consumer, installed once after boot and driven by TIM3.
static AUDIO_ISR: Mutex<RefCell<Option<SampleConsumer<'static, AudioDac>>>> =
    Mutex::new(RefCell::new(None));

#[interrupt]
fn TIM3() {
    acknowledge_update();
    critical_section::with(|cs| {
        if let Some(consumer) = AUDIO_ISR.borrow_ref_mut(cs).as_mut() {
            consumer.tick();
        }
    });
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!("{=str} v{=str}", APP_NAME, APP_VERSION);

    // Step 1: clocks
    let p = embassy_stm32::init(boot::build_embassy_config());

    // Step 2: watchdog
    let mut watchdog: Watchdog = IndependentWatchdog::new(p.IWDG1, WATCHDOG_TIMEOUT_US);
    watchdog.unleash(); // Cannot be stopped after this point
    defmt::info!(
        "IWDG watchdog armed: timeout={=u32}ms",
        WATCHDOG_TIMEOUT_MS
    );

    // SD card on SPI1, starting at the identification clock.
    let mut spi_config = SpiConfig::default();
    let ident = ClockDivider::nearest(SD_IDENT_DIVISOR);
    spi_config.frequency = Hertz(ident.frequency_hz(SPI_KERNEL_HZ));
    let spi = Spi::new(
        p.SPI1, p.PA5,      // SCK
        p.PA7,      // MOSI
        p.PA6,      // MISO
        p.DMA1_CH0, // TX DMA
        p.DMA1_CH1, // RX DMA
        spi_config,
    );
    let cs = Output::new(p.PA4, Level::High, Speed::VeryHigh);
    let mut card: Card = SdCard::new(Stm32Spi::new(spi, spi_config, SPI_KERNEL_HZ), cs);

    // MCP4725 on I2C1, blocking transfers (the sample ISR cannot await).
    let i2c = I2c::new(
        p.I2C1,
        p.PB8,
        p.PB9,
        Irqs,
        NoDma,
        NoDma,
        Hertz(I2C_FREQUENCY_HZ),
        Default::default(),
    );
    let mut dac: AudioDac = Mcp4725::with_address(BufferedI2c::new(i2c), DAC_I2C_ADDRESS);

    // Step 5: sample timer, interrupt masked until `B` arrives.
    let Some(reload) = auto_reload(TIMER_KERNEL_HZ) else {
        defmt::error!("sample period does not fit TIM3");
        park(watchdog).await;
        return;
    };
    let engine = PlaybackEngine::new(Tim3SampleTimer::new(reload));

    // Steps 3, 4, 6, 7
    let mut producer = Producer::new(&PIPELINE, AssetLayout::MUSIC);
    watchdog.pet();
    let report = match boot::bring_up(&mut card, &mut dac, &mut producer, &mut Delay).await {
        Ok(report) => report,
        Err(e) => {
            defmt::error!("Boot failed: {}", e);
            park(watchdog).await;
            return;
        }
    };
    watchdog.pet();
    defmt::info!("Boot complete: {}", report);

    critical_section::with(|cs| {
        AUDIO_ISR
            .borrow(cs)
            .replace(Some(SampleConsumer::new(&PIPELINE, dac)));
    });
    interrupt::TIM3.set_priority(Priority::P1);
    // SAFETY: the handler's only shared state is behind critical-section
    // mutexes and atomics, and the consumer is installed above.
    #[allow(unsafe_code)]
    unsafe {
        interrupt::TIM3.enable();
    }

    // Step 8: tasks
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = SERIAL_BAUD;
    let link = match Uart::new(
        p.USART3,
        p.PD9, // RX
        p.PD8, // TX
        Irqs,
        p.DMA1_CH2,
        p.DMA1_CH3,
        uart_config,
    ) {
        Ok(link) => link,
        Err(_) => {
            defmt::error!("USART3 configuration rejected");
            park(watchdog).await;
            return;
        }
    };

    spawner.must_spawn(refill_task(producer, card));
    spawner.must_spawn(command_task(link, CommandController::new(engine, &LEDS)));

    // Main loop - heartbeat
    defmt::info!("Entering main loop");
    loop {
        Timer::after(Duration::from_secs(1)).await;
        defmt::debug!("Pipeline: {} LEDs: {}", PIPELINE.snapshot(), LEDS.current());
        // Feed the IWDG watchdog. If this loop stalls, the MCU resets.
        watchdog.pet();
    }
}

/// Serve refill messages posted by the TIM3 handler.
#[embassy_executor::task]
async fn refill_task(mut producer: Producer<'static>, mut card: Card) {
    producer.run(&mut card).await;
}

/// Announce readiness, then apply command bytes from the master board.
#[embassy_executor::task]
async fn command_task(
    mut link: Link,
    mut controller: CommandController<'static, Tim3SampleTimer>,
) {
    if let Err(e) = link.write(&[READY_BYTE]).await {
        defmt::warn!("ready byte not sent: {}", e);
    }

    let mut byte = [0u8; 1];
    loop {
        if let Err(e) = link.read(&mut byte).await {
            defmt::warn!("serial read failed: {}", e);
            continue;
        }
        let [received] = byte;
        let Some(command) = Command::decode(received) else {
            defmt::trace!("ignored byte {=u8:#x}", received);
            continue;
        };

        // The DAC belongs to the sample consumer; borrow it for the pause
        // silence write while the ISR is held off.
        let outcome = critical_section::with(|cs| {
            let mut isr = AUDIO_ISR.borrow_ref_mut(cs);
            isr.as_mut()
                .map(|consumer| controller.handle(command, consumer.sink_mut()))
        });
        match outcome {
            Some(Ok(effect)) => defmt::info!("{} -> {}", command, effect),
            Some(Err(e)) => defmt::warn!("{} failed: {}", command, e),
            None => defmt::warn!("{} before audio was installed", command),
        }
    }
}

/// Stop here for good, keeping the watchdog fed so the fault stays visible
/// over RTT instead of reset-looping.
async fn park(mut watchdog: Watchdog) {
    loop {
        watchdog.pet();
        Timer::after(Duration::from_secs(1)).await;
    }
}
