//! # Pico Event Bench
//! RP2040 bench firmware: a periodic tick, SD card insert/remove and two
//! buttons drive a buzzer, LEDs and a serial line through one dispatch loop.

#![no_std]
#![no_main]

use defmt::{info, panic};
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use pico_event_bench::hal::ButtonPad;
use pico_event_bench::selftest::Diagnostics;
use pico_event_bench::{
    Controller, DeviceEvent, Dispatcher, EventKind, EventRegistry, EventSource, SetupError,
};
use {defmt_rtt as _, panic_probe as _};

mod board;
mod task;

use task::{
    buzzer_driver, buzzer_handle, card_poller, red_blinker, tick_timer, yellow_blinker,
};

/// Firmware version - automatically populated from Cargo.toml
pub static FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Event sources, one per producer
static TICK_SOURCE: EventSource = EventSource::new();
static CARD_INSERT_SOURCE: EventSource = EventSource::new();
static CARD_REMOVE_SOURCE: EventSource = EventSource::new();

/// Helper function to spawn tasks and unwrap, panicking if spawn fails.
/// This is acceptable during initialization as we want to fail fast if we can't spawn a task.
#[allow(clippy::unwrap_used)]
fn spawn_unwrap<S>(spawner: &Spawner, token: embassy_executor::SpawnToken<S>) {
    spawner.spawn(token).unwrap();
}

/// Event wiring mistakes are fatal: halt before the dispatch loop starts.
fn setup_unwrap<T>(result: Result<T, SetupError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("Event setup failed: {}", e),
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting pico-event-bench v{}", FIRMWARE_VERSION);

    let p = embassy_rp::init(Default::default());

    // Configure all GPIO, the serial line, the buzzer and the SD card bus
    let mut board = board::init_all(
        p.PIN_14, p.PIN_15, p.PIN_22, p.PIN_18, p.PIN_19, p.PIN_20, p.PWM_SLICE0, p.PIN_16,
        p.UART0, p.PIN_0, p.SPI1, p.PIN_10, p.PIN_11, p.PIN_12, p.PIN_13,
    );

    // A button held during reset skips the blinkers so benchmarks run undisturbed.
    // Read once, never re-evaluated.
    if board.buttons.sample().any_held() {
        info!("Button held at reset, LED blinkers disabled");
    } else {
        spawn_unwrap(&spawner, red_blinker(board.red_leds));
        spawn_unwrap(&spawner, yellow_blinker(board.yellow_led));
    }

    spawn_unwrap(&spawner, buzzer_driver(board.buzzer));

    // Start the event producers
    spawn_unwrap(&spawner, tick_timer(&TICK_SOURCE));
    spawn_unwrap(
        &spawner,
        card_poller(board.card_detect, &CARD_INSERT_SOURCE, &CARD_REMOVE_SOURCE),
    );

    // Bind each source to its dispatch slot
    let mut registry: EventRegistry<'static, CriticalSectionRawMutex, { DeviceEvent::COUNT }> =
        EventRegistry::new();
    setup_unwrap(registry.register(&TICK_SOURCE, DeviceEvent::Tick.id()));
    setup_unwrap(registry.register(&CARD_INSERT_SOURCE, DeviceEvent::CardInserted.id()));
    setup_unwrap(registry.register(&CARD_REMOVE_SOURCE, DeviceEvent::CardRemoved.id()));
    let dispatcher = setup_unwrap(Dispatcher::new(
        registry,
        setup_unwrap(DeviceEvent::table()),
    ));

    let mut controller = Controller::new(
        board.buttons,
        buzzer_handle(),
        board.serial,
        board.storage,
        Diagnostics::default(),
    );

    info!("All tasks spawned, serving events");
    dispatcher.run(&mut controller).await
}
