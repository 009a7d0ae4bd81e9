//! Periodic tick task
//! Drives the timer event source at the configured interval

use pico_event_bench::EventSource;
use pico_event_bench::config::TICK_INTERVAL;
use pico_event_bench::timer::PeriodicTimer;

/// Tick task - raises `source` every `TICK_INTERVAL`, forever
#[embassy_executor::task]
pub async fn tick_timer(source: &'static EventSource) -> ! {
    PeriodicTimer::new(TICK_INTERVAL, source).run().await
}
