//! Tone requests between the dispatch task and the buzzer driver
//!
//! Every request carries a sequence number and the driver reports the number
//! of the request it finished. A blocking caller therefore waits for its own
//! tone, never for the completion of a tone that was already sounding when it
//! asked. A request that arrives before the driver picks up the previous one
//! replaces it.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::signal::Signal;

use crate::hal::{Buzzer, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ToneRequest {
    pub seq: u32,
    pub tone: Tone,
}

/// Request and completion signals shared by one sender and one driver
pub struct ToneChannel<M: RawMutex = CriticalSectionRawMutex> {
    request: Signal<M, ToneRequest>,
    done: Signal<M, u32>,
}

impl<M: RawMutex> ToneChannel<M> {
    pub const fn new() -> Self {
        Self {
            request: Signal::new(),
            done: Signal::new(),
        }
    }

    /// The requesting side. Sequence numbers are only unique per sender, so
    /// a channel should have exactly one.
    pub fn sender(&self) -> ToneSender<'_, M> {
        ToneSender {
            channel: self,
            next_seq: 0,
        }
    }

    /// Waits for the next request
    pub async fn next_request(&self) -> ToneRequest {
        self.request.wait().await
    }

    /// Reports request `seq` as played to the end
    pub fn finished(&self, seq: u32) {
        self.done.signal(seq);
    }
}

impl<M: RawMutex> Default for ToneChannel<M> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ToneSender<'a, M: RawMutex = CriticalSectionRawMutex> {
    channel: &'a ToneChannel<M>,
    next_seq: u32,
}

impl<M: RawMutex> ToneSender<'_, M> {
    fn submit(&mut self, tone: Tone) -> u32 {
        let seq = self.next_seq;
        self.next_seq = seq.wrapping_add(1);
        self.channel.request.signal(ToneRequest { seq, tone });
        seq
    }
}

impl<M: RawMutex> Buzzer for ToneSender<'_, M> {
    fn play(&mut self, tone: Tone) {
        self.submit(tone);
    }

    async fn play_blocking(&mut self, tone: Tone) {
        let seq = self.submit(tone);
        loop {
            let finished = self.channel.done.wait().await;
            if finished == seq {
                break;
            }
            trace!("tone {} finished, waiting for {}", finished, seq);
        }
    }
}
