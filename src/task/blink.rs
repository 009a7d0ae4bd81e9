//! LED blinker tasks
//! Free-running patterns with no link to the event system

use defmt::info;
use embassy_rp::gpio::Output;
use pico_event_bench::blink::{RED_PATTERN, YELLOW_PATTERN, blink};

/// Red pair blinker (LED1, LED2)
#[embassy_executor::task]
pub async fn red_blinker(leds: [Output<'static>; 2]) -> ! {
    info!("Red blinker task started");
    blink(leds, &RED_PATTERN).await
}

/// Yellow blinker (LED3)
#[embassy_executor::task]
pub async fn yellow_blinker(led: [Output<'static>; 1]) -> ! {
    info!("Yellow blinker task started");
    blink(led, &YELLOW_PATTERN).await
}
