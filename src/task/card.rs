//! Card presence polling task
//! Samples the card-detect switch and raises insert/remove events

use pico_event_bench::EventSource;
use pico_event_bench::card::CardPoller;
use pico_event_bench::config::{CARD_POLL_INTERVAL, CARD_SETTLE_SAMPLES};

use crate::board::CardDetectPin;

/// Card poller task - one sample every `CARD_POLL_INTERVAL`
#[embassy_executor::task]
pub async fn card_poller(
    detect: CardDetectPin,
    insert: &'static EventSource,
    remove: &'static EventSource,
) -> ! {
    CardPoller::new(CARD_SETTLE_SAMPLES)
        .run(detect, CARD_POLL_INTERVAL, insert, remove)
        .await
}
