//! Card presence poller
//!
//! Samples the card-detect line at a fixed period and raises the insert or
//! remove source on each physical transition. An insertion only counts once
//! the line has read "present" for `settle_samples` consecutive polls, which
//! rides out contact bounce while the card slides in. A failed or "absent"
//! sample while settling starts the count over. Removal is reported on the
//! first "absent" sample. A failed sample never produces an edge.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};

use crate::event::EventSource;
use crate::hal::CardDetect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardPresence {
    Absent,
    Present,
}

/// Transition reported by [`CardPoller::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardEdge {
    Inserted,
    Removed,
}

pub struct CardPoller {
    presence: CardPresence,
    settle_samples: u8,
    /// Present samples still needed before an insertion is confirmed
    countdown: u8,
}

impl CardPoller {
    pub const fn new(settle_samples: u8) -> Self {
        let settle_samples = if settle_samples == 0 { 1 } else { settle_samples };
        Self {
            presence: CardPresence::Absent,
            settle_samples,
            countdown: settle_samples,
        }
    }

    pub fn presence(&self) -> CardPresence {
        self.presence
    }

    /// Feeds one sample through the state machine
    pub fn update<E>(&mut self, sample: Result<bool, E>) -> Option<CardEdge> {
        let Ok(inserted) = sample else {
            if self.presence == CardPresence::Absent {
                self.countdown = self.settle_samples;
            }
            return None;
        };

        match (self.presence, inserted) {
            (CardPresence::Absent, true) => {
                self.countdown -= 1;
                if self.countdown == 0 {
                    self.presence = CardPresence::Present;
                    Some(CardEdge::Inserted)
                } else {
                    None
                }
            }
            (CardPresence::Absent, false) => {
                self.countdown = self.settle_samples;
                None
            }
            (CardPresence::Present, false) => {
                self.presence = CardPresence::Absent;
                self.countdown = self.settle_samples;
                Some(CardEdge::Removed)
            }
            (CardPresence::Present, true) => None,
        }
    }

    /// Polls `detect` every `period` forever, raising `insert` and `remove`
    pub async fn run<D, M>(
        mut self,
        mut detect: D,
        period: Duration,
        insert: &EventSource<M>,
        remove: &EventSource<M>,
    ) -> !
    where
        D: CardDetect,
        M: RawMutex,
    {
        info!("Card poller started, every {} ms", period.as_millis());
        loop {
            let sample = detect.is_inserted();
            if let Err(e) = &sample {
                trace!("card detect read failed: {:?}", loggable(e));
            }
            match self.update(sample) {
                Some(CardEdge::Inserted) => {
                    info!("Card inserted");
                    insert.broadcast();
                }
                Some(CardEdge::Removed) => {
                    info!("Card removed");
                    remove.broadcast();
                }
                None => {}
            }
            Timer::after(period).await;
        }
    }
}

#[cfg(feature = "defmt")]
fn loggable<E: core::fmt::Debug>(e: &E) -> defmt::Debug2Format<'_, E> {
    defmt::Debug2Format(e)
}

#[cfg(not(feature = "defmt"))]
fn loggable<E: core::fmt::Debug>(e: &E) -> &E {
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn feed(poller: &mut CardPoller, samples: &[Result<bool, ()>]) -> Vec<CardEdge> {
        samples
            .iter()
            .filter_map(|sample| poller.update(*sample))
            .collect()
    }

    #[test]
    fn starts_absent() {
        assert_eq!(CardPoller::new(3).presence(), CardPresence::Absent);
    }

    #[test]
    fn insertion_needs_settled_samples() {
        let mut poller = CardPoller::new(3);

        assert!(feed(&mut poller, &[Ok(true), Ok(true)]).is_empty());
        assert_eq!(poller.presence(), CardPresence::Absent);
        assert_eq!(feed(&mut poller, &[Ok(true)]), [CardEdge::Inserted]);
        assert_eq!(poller.presence(), CardPresence::Present);
    }

    #[test]
    fn bounce_restarts_settling() {
        let mut poller = CardPoller::new(3);

        let edges = feed(
            &mut poller,
            &[Ok(true), Ok(true), Ok(false), Ok(true), Ok(true)],
        );
        assert!(edges.is_empty());
        assert_eq!(feed(&mut poller, &[Ok(true)]), [CardEdge::Inserted]);
    }

    #[test]
    fn removal_is_immediate() {
        let mut poller = CardPoller::new(1);

        assert_eq!(
            feed(&mut poller, &[Ok(true), Ok(true), Ok(false), Ok(false)]),
            [CardEdge::Inserted, CardEdge::Removed]
        );
    }

    #[test]
    fn failed_samples_change_nothing() {
        let mut poller = CardPoller::new(1);

        assert!(feed(&mut poller, &[Err(()), Err(())]).is_empty());
        assert_eq!(feed(&mut poller, &[Ok(true), Err(()), Ok(true)]), [CardEdge::Inserted]);
        assert!(feed(&mut poller, &[Err(())]).is_empty());
        assert_eq!(poller.presence(), CardPresence::Present);
    }

    #[test]
    fn failed_sample_restarts_settling() {
        let mut poller = CardPoller::new(3);

        assert!(feed(&mut poller, &[Ok(true), Ok(true), Err(()), Ok(true)]).is_empty());
        assert_eq!(poller.presence(), CardPresence::Absent);
        assert_eq!(feed(&mut poller, &[Ok(true), Ok(true)]), [CardEdge::Inserted]);
    }

    #[test]
    fn edges_alternate() {
        let mut poller = CardPoller::new(2);
        let pattern = [
            Ok(true), Ok(true), Ok(true), Err(()), Ok(false), Ok(false), Ok(true), Ok(false),
            Ok(true), Ok(true), Err(()), Ok(true), Ok(false), Ok(true), Ok(true), Ok(false),
        ];

        let edges = feed(&mut poller, &pattern);

        assert_eq!(
            edges,
            [
                CardEdge::Inserted,
                CardEdge::Removed,
                CardEdge::Inserted,
                CardEdge::Removed,
                CardEdge::Inserted,
                CardEdge::Removed,
            ]
        );
        assert!(edges.windows(2).all(|pair| pair[0] != pair[1]));
    }
}
