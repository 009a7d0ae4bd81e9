//! Periodic timer event source
//!
//! Free running: each tick is scheduled from the previous tick, not from
//! when the dispatch task consumed it. A late consumer sees the source ready
//! immediately, and several missed ticks collapse into one notification.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker};

use crate::event::EventSource;

pub struct PeriodicTimer<'a, M: RawMutex> {
    interval: Duration,
    source: &'a EventSource<M>,
}

impl<'a, M: RawMutex> PeriodicTimer<'a, M> {
    pub const fn new(interval: Duration, source: &'a EventSource<M>) -> Self {
        Self { interval, source }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Raises the source once per interval, forever
    pub async fn run(self) -> ! {
        info!("Periodic timer started, every {} ms", self.interval.as_millis());
        let mut ticker = Ticker::every(self.interval);
        loop {
            ticker.next().await;
            self.source.broadcast();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Dispatcher, EventHandler, EventKind, HandlerTable};
    use crate::event::{EventId, EventRegistry};
    use embassy_futures::block_on;
    use embassy_futures::select::{Either, select};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_time::{Instant, Timer};

    #[derive(Clone, Copy)]
    struct Tick;

    impl EventKind for Tick {
        fn id(self) -> EventId {
            EventId::new(0)
        }
    }

    #[derive(Default)]
    struct Counter {
        ticks: u32,
    }

    impl EventHandler<Tick> for Counter {
        async fn handle(&mut self, _event: Tick) {
            self.ticks += 1;
        }
    }

    #[test]
    fn fast_handler_sees_every_period() {
        const PERIODS: u32 = 5;
        let interval = Duration::from_millis(20);
        let source: EventSource<CriticalSectionRawMutex> = EventSource::new();
        let mut registry: EventRegistry<'_, CriticalSectionRawMutex, 1> = EventRegistry::new();
        registry.register(&source, EventId::new(0)).unwrap();
        let mut dispatcher =
            Dispatcher::new(registry, HandlerTable::new([Tick]).unwrap()).unwrap();
        let mut counter = Counter::default();

        let start = Instant::now();
        let served = block_on(async {
            let serve = async {
                let mut wakeups = 0;
                while counter.ticks < PERIODS {
                    let mask = dispatcher.dispatch_once(&mut counter).await;
                    assert_eq!(mask.len(), 1);
                    wakeups += 1;
                }
                wakeups
            };
            match select(PeriodicTimer::new(interval, &source).run(), serve).await {
                Either::First(_) => unreachable!(),
                Either::Second(wakeups) => wakeups,
            }
        });

        assert_eq!(served, PERIODS);
        assert_eq!(counter.ticks, PERIODS);
        assert!(start.elapsed() >= interval * PERIODS);
    }

    #[test]
    fn slow_consumer_merges_ticks() {
        let interval = Duration::from_millis(10);
        let source: EventSource<CriticalSectionRawMutex> = EventSource::new();

        block_on(async {
            let stall = Timer::after(interval * 5);
            match select(PeriodicTimer::new(interval, &source).run(), stall).await {
                Either::First(_) => unreachable!(),
                Either::Second(()) => {}
            }
        });

        // Several periods elapsed, one pending notification
        assert!(source.is_pending());
        let mut registry: EventRegistry<'_, CriticalSectionRawMutex, 1> = EventRegistry::new();
        registry.register(&source, EventId::new(0)).unwrap();
        assert_eq!(block_on(registry.wait_any()).len(), 1);
        assert!(!source.is_pending());
    }
}
