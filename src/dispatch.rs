//! Dispatch loop
//!
//! Waits on the registry and, for each ready source, runs the handler bound
//! to it. Sources ready in the same wake-up are handled in table order, one
//! call per source. Handlers run to completion on the dispatching task, so a
//! slow handler delays every other source; that is accepted here and is what
//! keeps the ordering guarantee.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::event::{EventId, EventMask, EventRegistry, SetupError};

/// Enumerated event kinds that can sit in a [`HandlerTable`]
pub trait EventKind: Copy {
    /// Listener id this kind is dispatched for
    fn id(self) -> EventId;
}

/// Receiver of dispatched events
#[allow(async_fn_in_trait)]
pub trait EventHandler<E: EventKind> {
    async fn handle(&mut self, event: E);
}

/// Dispatch order, one entry per listener, entry `i` bound to id `i`
#[derive(Debug, Clone, Copy)]
pub struct HandlerTable<E: EventKind, const N: usize> {
    entries: [E; N],
}

impl<E: EventKind, const N: usize> HandlerTable<E, N> {
    pub fn new(entries: [E; N]) -> Result<Self, SetupError> {
        for (position, entry) in entries.iter().enumerate() {
            let found = entry.id();
            if found.index() != position {
                return Err(SetupError::HandlerOutOfOrder {
                    position: position as u8,
                    found: found.index() as u8,
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[E; N] {
        &self.entries
    }
}

/// The dispatch task's state: listeners plus the table they map into
pub struct Dispatcher<'a, E: EventKind, M: RawMutex, const N: usize> {
    registry: EventRegistry<'a, M, N>,
    table: HandlerTable<E, N>,
}

impl<'a, E: EventKind, M: RawMutex, const N: usize> Dispatcher<'a, E, M, N> {
    /// Pairs a fully registered registry with its handler table
    pub fn new(
        registry: EventRegistry<'a, M, N>,
        table: HandlerTable<E, N>,
    ) -> Result<Self, SetupError> {
        if registry.len() != N {
            return Err(SetupError::TableMismatch {
                listeners: registry.len(),
                handlers: N,
            });
        }
        Ok(Self { registry, table })
    }

    /// One dispatch cycle: wait, then handle every ready source.
    /// Returns the mask that was handled.
    pub async fn dispatch_once<H: EventHandler<E>>(&mut self, handler: &mut H) -> EventMask {
        let ready = self.registry.wait_any().await;
        trace!("dispatch mask {}", ready.bits());

        for entry in self.table.entries.iter().copied() {
            if ready.contains(entry.id()) {
                handler.handle(entry).await;
            }
        }
        ready
    }

    /// Serves events forever
    pub async fn run<H: EventHandler<E>>(mut self, handler: &mut H) -> ! {
        info!("Dispatch loop started with {} listeners", N);
        loop {
            self.dispatch_once(handler).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSource;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        A,
        B,
        C,
    }

    impl EventKind for Kind {
        fn id(self) -> EventId {
            EventId::new(self as u8)
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Kind>,
    }

    impl EventHandler<Kind> for Recorder {
        async fn handle(&mut self, event: Kind) {
            self.calls.push(event);
        }
    }

    fn registry<'a>(
        sources: &'a [EventSource<CriticalSectionRawMutex>; 3],
    ) -> EventRegistry<'a, CriticalSectionRawMutex, 3> {
        let mut registry = EventRegistry::new();
        for (index, source) in sources.iter().enumerate() {
            registry.register(source, EventId::new(index as u8)).unwrap();
        }
        registry
    }

    #[test]
    fn table_must_follow_ids() {
        assert_eq!(
            HandlerTable::new([Kind::A, Kind::C, Kind::B]).err(),
            Some(SetupError::HandlerOutOfOrder {
                position: 1,
                found: 2
            })
        );
    }

    #[test]
    fn table_and_listeners_must_agree() {
        let sources: [EventSource<CriticalSectionRawMutex>; 2] =
            [EventSource::new(), EventSource::new()];
        let mut registry: EventRegistry<'_, CriticalSectionRawMutex, 3> = EventRegistry::new();
        registry.register(&sources[0], EventId::new(0)).unwrap();
        registry.register(&sources[1], EventId::new(1)).unwrap();
        let table = HandlerTable::new([Kind::A, Kind::B, Kind::C]).unwrap();

        assert_eq!(
            Dispatcher::new(registry, table).err(),
            Some(SetupError::TableMismatch {
                listeners: 2,
                handlers: 3
            })
        );
    }

    #[test]
    fn simultaneous_events_follow_table_order() {
        let sources = [EventSource::new(), EventSource::new(), EventSource::new()];
        let table = HandlerTable::new([Kind::A, Kind::B, Kind::C]).unwrap();
        let mut dispatcher = Dispatcher::new(registry(&sources), table).unwrap();
        let mut recorder = Recorder::default();

        // Raised in reverse, handled in table order
        sources[2].broadcast();
        sources[0].broadcast();
        sources[1].broadcast();
        let mask = block_on(dispatcher.dispatch_once(&mut recorder));

        assert_eq!(mask, EventMask::from_bits(0b111));
        assert_eq!(recorder.calls, [Kind::A, Kind::B, Kind::C]);
    }

    #[test]
    fn each_ready_source_is_handled_once_per_wakeup() {
        let sources = [EventSource::new(), EventSource::new(), EventSource::new()];
        let table = HandlerTable::new([Kind::A, Kind::B, Kind::C]).unwrap();
        let mut dispatcher = Dispatcher::new(registry(&sources), table).unwrap();
        let mut recorder = Recorder::default();

        let firings: [&[usize]; 4] = [&[1], &[0, 2], &[2, 2, 2], &[0, 1]];
        for fired in firings {
            for &index in fired {
                sources[index].broadcast();
            }
            block_on(dispatcher.dispatch_once(&mut recorder));
        }

        assert_eq!(
            recorder.calls,
            [Kind::B, Kind::A, Kind::C, Kind::C, Kind::A, Kind::B]
        );
        assert!(sources.iter().all(|source| !source.is_pending()));
    }
}
