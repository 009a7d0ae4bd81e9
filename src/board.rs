//! RP2040 pin map and adapters from embassy-rp peripherals to the control loop.
//!
//! - BUTTON1     -> GPIO14 (active low, pull-up)
//! - BUTTON2     -> GPIO15 (active low, pull-up)
//! - CARD_DETECT -> GPIO22 (active low, pull-up)
//! - LED1/LED2   -> GPIO18/GPIO19 (red pair)
//! - LED3        -> GPIO20 (yellow)
//! - BUZZER      -> GPIO16 (PWM slice 0, channel A)
//! - UART0 TX    -> GPIO0
//! - SPI1        -> SCK GPIO10, MOSI GPIO11, MISO GPIO12, CS GPIO13

use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{self, SPI1, UART0};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::spi::{self, Blocking, Spi};
use embassy_rp::uart::{self, BufferedInterruptHandler, BufferedUartTx};
use embassy_rp::{Peri, bind_interrupts};
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::sdcard::DummyCsPin;
use pico_event_bench::config::SERIAL_BAUDRATE;
use pico_event_bench::hal::{ActiveLowDetect, ButtonPad, ButtonState};
use pico_event_bench::sdcard::SdStorage;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

/// SPI clock during card identification must stay at or below 400 kHz
const SD_SPI_FREQUENCY: u32 = 400_000;

const SERIAL_TX_BUFFER_SIZE: usize = 64;
static SERIAL_TX_BUFFER: StaticCell<[u8; SERIAL_TX_BUFFER_SIZE]> = StaticCell::new();

pub type CardSpi = ExclusiveDevice<Spi<'static, SPI1, Blocking>, DummyCsPin, Delay>;
pub type CardStorage = SdStorage<CardSpi, Output<'static>, Delay>;
pub type CardDetectPin = ActiveLowDetect<Input<'static>>;

/// The two bench buttons
pub struct Buttons<'d> {
    pub button1: Input<'d>,
    pub button2: Input<'d>,
}

impl ButtonPad for Buttons<'_> {
    fn sample(&mut self) -> ButtonState {
        ButtonState {
            button1: self.button1.is_low(),
            button2: self.button2.is_low(),
        }
    }
}

/// Everything the firmware drives, split per owning task
pub struct Board {
    pub buttons: Buttons<'static>,
    pub card_detect: CardDetectPin,
    pub storage: CardStorage,
    pub serial: BufferedUartTx,
    pub buzzer: Pwm<'static>,
    pub red_leds: [Output<'static>; 2],
    pub yellow_led: [Output<'static>; 1],
}

/// Initialize all board peripherals.
#[allow(clippy::too_many_arguments)]
pub fn init_all(
    pin_14: Peri<'static, peripherals::PIN_14>,
    pin_15: Peri<'static, peripherals::PIN_15>,
    pin_22: Peri<'static, peripherals::PIN_22>,
    pin_18: Peri<'static, peripherals::PIN_18>,
    pin_19: Peri<'static, peripherals::PIN_19>,
    pin_20: Peri<'static, peripherals::PIN_20>,
    pwm_slice0: Peri<'static, peripherals::PWM_SLICE0>,
    pin_16: Peri<'static, peripherals::PIN_16>,
    uart0: Peri<'static, UART0>,
    pin_0: Peri<'static, peripherals::PIN_0>,
    spi1: Peri<'static, SPI1>,
    pin_10: Peri<'static, peripherals::PIN_10>,
    pin_11: Peri<'static, peripherals::PIN_11>,
    pin_12: Peri<'static, peripherals::PIN_12>,
    pin_13: Peri<'static, peripherals::PIN_13>,
) -> Board {
    // Buttons and card detect
    let buttons = Buttons {
        button1: Input::new(pin_14, Pull::Up),
        button2: Input::new(pin_15, Pull::Up),
    };
    let card_detect = ActiveLowDetect::new(Input::new(pin_22, Pull::Up));

    // LEDs start dark (driven high)
    let red_leds = [
        Output::new(pin_18, Level::High),
        Output::new(pin_19, Level::High),
    ];
    let yellow_led = [Output::new(pin_20, Level::High)];

    // Buzzer, silent until the driver task configures a tone
    let buzzer = Pwm::new_output_a(pwm_slice0, pin_16, PwmConfig::default());

    // Serial
    let mut uart_config = uart::Config::default();
    uart_config.baudrate = SERIAL_BAUDRATE;
    let serial = BufferedUartTx::new(
        uart0,
        Irqs,
        pin_0,
        SERIAL_TX_BUFFER.init([0; SERIAL_TX_BUFFER_SIZE]),
        uart_config,
    );

    // SD card on SPI1
    let mut spi_config = spi::Config::default();
    spi_config.frequency = SD_SPI_FREQUENCY;
    let bus = Spi::new_blocking(spi1, pin_10, pin_11, pin_12, spi_config);
    // The card driver owns CS; the bus device gets a placeholder
    let device = ExclusiveDevice::new(bus, DummyCsPin, Delay);
    let storage = SdStorage::new(device, Output::new(pin_13, Level::High), Delay);

    Board {
        buttons,
        card_detect,
        storage,
        serial,
        buzzer,
        red_leds,
        yellow_led,
    }
}
