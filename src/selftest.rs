//! On-demand diagnostic bench
//!
//! A short suite run from the timer handler when no button is held. Each
//! case prints a line on the serial port; the last line is the verdict.

use core::fmt::Write as _;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use heapless::String;

use crate::event::{EventId, EventMask, EventRegistry, EventSource};
use crate::hal::{SelfTest, TestStatus};

/// Line buffer for one report line
type Line = String<96>;

pub struct Diagnostics {
    /// How long the signal round-trip benchmark runs
    bench_window: Duration,
    /// Requested delay for the timer accuracy check
    probe_delay: Duration,
    /// Accepted overshoot for the timer accuracy check
    timer_slack: Duration,
    runs: u32,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl Diagnostics {
    pub const fn new(bench_window: Duration) -> Self {
        Self {
            bench_window,
            probe_delay: Duration::from_millis(10),
            timer_slack: Duration::from_millis(5),
            runs: 0,
        }
    }

    /// Overrides the accepted timer overshoot
    pub const fn with_timer_slack(mut self, slack: Duration) -> Self {
        self.timer_slack = slack;
        self
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }
}

impl SelfTest for Diagnostics {
    async fn run<W: embedded_io_async::Write>(&mut self, serial: &mut W) -> TestStatus {
        self.runs += 1;
        let mut failures: u8 = 0;

        report(serial, format_args!("\r\n*** Self-test run {}\r\n", self.runs)).await;

        let mask = event_mask_check().await;
        let ok = mask == EventMask::from_bits(0b101);
        failures += u8::from(!ok);
        report(
            serial,
            format_args!("--- event mask: {:#05b} {}\r\n", mask.bits(), verdict(ok)),
        )
        .await;

        let trips = signal_round_trips(self.bench_window).await;
        let ok = trips > 0;
        failures += u8::from(!ok);
        report(
            serial,
            format_args!(
                "--- signal round trips: {} in {} ms {}\r\n",
                trips,
                self.bench_window.as_millis(),
                verdict(ok)
            ),
        )
        .await;

        let elapsed = timer_accuracy(self.probe_delay).await;
        let ok = elapsed >= self.probe_delay && elapsed <= self.probe_delay + self.timer_slack;
        failures += u8::from(!ok);
        report(
            serial,
            format_args!(
                "--- timer {} ms took {} us {}\r\n",
                self.probe_delay.as_millis(),
                elapsed.as_micros(),
                verdict(ok)
            ),
        )
        .await;

        let status = if failures == 0 {
            TestStatus::Passed
        } else {
            TestStatus::Failed { failures }
        };
        let summary = match status {
            TestStatus::Passed => "SUCCESS",
            TestStatus::Failed { .. } => "FAILURE",
        };
        report(serial, format_args!("\r\nFinal result: {}\r\n", summary)).await;
        status
    }
}

fn verdict(ok: bool) -> &'static str {
    if ok { "ok" } else { "FAIL" }
}

async fn report<W: embedded_io_async::Write>(serial: &mut W, args: core::fmt::Arguments<'_>) {
    let mut line = Line::new();
    if line.write_fmt(args).is_err() {
        warn!("Self-test report line truncated");
    }
    if serial.write_all(line.as_bytes()).await.is_err() {
        warn!("Self-test report not written");
    }
}

/// Raises two of three local sources and returns what a registry collects
async fn event_mask_check() -> EventMask {
    let sources: [EventSource<CriticalSectionRawMutex>; 3] =
        [EventSource::new(), EventSource::new(), EventSource::new()];
    let mut registry: EventRegistry<'_, CriticalSectionRawMutex, 3> = EventRegistry::new();
    for (index, source) in sources.iter().enumerate() {
        if registry.register(source, EventId::new(index as u8)).is_err() {
            return EventMask::empty();
        }
    }
    sources[2].broadcast();
    sources[0].broadcast();
    registry.wait_any().await
}

/// Ping-pong between two signals for `window`, counting completed exchanges
async fn signal_round_trips(window: Duration) -> u32 {
    let ping: Signal<CriticalSectionRawMutex, ()> = Signal::new();
    let pong: Signal<CriticalSectionRawMutex, ()> = Signal::new();
    let deadline = Instant::now() + window;

    let driver = async {
        let mut trips = 0;
        while Instant::now() < deadline {
            ping.signal(());
            pong.wait().await;
            trips += 1;
        }
        trips
    };
    let echo = async {
        loop {
            ping.wait().await;
            pong.signal(());
        }
    };

    match select(driver, echo).await {
        Either::First(trips) => trips,
        Either::Second(_) => unreachable!(),
    }
}

async fn timer_accuracy(delay: Duration) -> Duration {
    let start = Instant::now();
    Timer::after(delay).await;
    start.elapsed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use std::vec::Vec;

    #[derive(Default)]
    struct Capture {
        bytes: Vec<u8>,
    }

    impl embedded_io_async::ErrorType for Capture {
        type Error = Infallible;
    }

    impl embedded_io_async::Write for Capture {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn suite_passes_and_reports() {
        let mut diagnostics =
            Diagnostics::new(Duration::from_millis(20)).with_timer_slack(Duration::from_millis(50));
        let mut serial = Capture::default();

        let status = block_on(diagnostics.run(&mut serial));
        let text = core::str::from_utf8(&serial.bytes).unwrap();

        assert_eq!(status, TestStatus::Passed);
        assert_eq!(diagnostics.runs(), 1);
        assert!(text.contains("*** Self-test run 1"));
        assert!(text.contains("--- event mask: 0b101 ok"));
        assert!(text.ends_with("Final result: SUCCESS\r\n"));
    }

    #[test]
    fn round_trips_happen() {
        assert!(block_on(signal_round_trips(Duration::from_millis(5))) > 0);
    }
}
