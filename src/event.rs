//! Event sources and the listener registry
//!
//! Every producer (periodic timer, card poller) owns a `'static`
//! [`EventSource`] and raises it with [`EventSource::broadcast`]. The dispatch
//! task binds each source to a dense [`EventId`] through an [`EventRegistry`]
//! and then suspends in [`EventRegistry::wait_any`], which returns the mask of
//! *every* source raised since the previous wait.
//!
//! A source holds at most one pending notification: raising it again before
//! the dispatch task consumes it merges the two.

use core::fmt;
use core::future::pending;

use embassy_futures::select::select_array;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::signal::Signal;
use heapless::Vec;

/// Dense identifier of a registered source, also its dispatch table index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventId(u8);

impl EventId {
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Mask bit for this id, zero past [`EventMask::CAPACITY`]
    const fn bit(self) -> u32 {
        if self.index() < EventMask::CAPACITY {
            1 << self.0
        } else {
            0
        }
    }
}

/// Set of sources found ready by a single wait
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventMask(u32);

impl EventMask {
    /// Largest number of sources a mask can describe
    pub const CAPACITY: usize = u32::BITS as usize;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, id: EventId) -> bool {
        (self.0 & id.bit()) != 0
    }

    /// Adds `id`. Ids past [`Self::CAPACITY`] are ignored.
    pub fn insert(&mut self, id: EventId) {
        self.0 |= id.bit();
    }

    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Ids in the mask, lowest first
    pub fn iter(self) -> impl Iterator<Item = EventId> {
        (0..u32::BITS as u8)
            .map(EventId::new)
            .filter(move |id| self.contains(*id))
    }
}

/// Producer of wake-up signals for the dispatch task
pub struct EventSource<M: RawMutex = CriticalSectionRawMutex> {
    pending: Signal<M, ()>,
}

impl<M: RawMutex> EventSource<M> {
    pub const fn new() -> Self {
        Self {
            pending: Signal::new(),
        }
    }

    /// Marks the source ready and wakes the task waiting on it
    pub fn broadcast(&self) {
        self.pending.signal(());
    }

    /// Whether a notification is waiting to be consumed
    pub fn is_pending(&self) -> bool {
        self.pending.signaled()
    }
}

impl<M: RawMutex> Default for EventSource<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Binding of one source to its dispatch id, handed back by [`EventRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Listener {
    id: EventId,
}

impl Listener {
    pub const fn id(&self) -> EventId {
        self.id
    }
}

/// Wiring mistakes detected while the event system is being set up.
/// All of them are fatal: the firmware halts before dispatching anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupError {
    /// More sources registered than the registry holds
    CapacityExceeded { capacity: usize },
    /// Ids must be handed out as 0, 1, 2, ... in registration order
    NonDenseId { expected: u8, found: u8 },
    /// The same source was registered twice
    DuplicateSource { id: u8 },
    /// Handler table entry does not carry the id of its position
    HandlerOutOfOrder { position: u8, found: u8 },
    /// Handler table and listener count disagree
    TableMismatch { listeners: usize, handlers: usize },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { capacity } => {
                write!(f, "event registry full ({capacity} sources)")
            }
            Self::NonDenseId { expected, found } => {
                write!(f, "listener id {found} registered, expected {expected}")
            }
            Self::DuplicateSource { id } => {
                write!(f, "source already registered as listener {id}")
            }
            Self::HandlerOutOfOrder { position, found } => {
                write!(f, "handler at position {position} is bound to id {found}")
            }
            Self::TableMismatch {
                listeners,
                handlers,
            } => write!(f, "{listeners} listeners but {handlers} handlers"),
        }
    }
}

/// Fixed-capacity table of listeners owned by the dispatch task
pub struct EventRegistry<'a, M: RawMutex = CriticalSectionRawMutex, const N: usize = 8> {
    sources: Vec<&'a EventSource<M>, N>,
}

impl<'a, M: RawMutex, const N: usize> EventRegistry<'a, M, N> {
    pub const fn new() -> Self {
        const { assert!(N <= EventMask::CAPACITY, "registry larger than an EventMask") };
        Self { sources: Vec::new() }
    }

    /// Binds `source` to `id`. Ids are dense and follow call order.
    pub fn register(
        &mut self,
        source: &'a EventSource<M>,
        id: EventId,
    ) -> Result<Listener, SetupError> {
        let expected = self.sources.len();
        if expected >= N {
            return Err(SetupError::CapacityExceeded { capacity: N });
        }
        if id.index() != expected {
            return Err(SetupError::NonDenseId {
                expected: expected as u8,
                found: id.0,
            });
        }
        if let Some(existing) = self
            .sources
            .iter()
            .position(|bound| core::ptr::eq(*bound, source))
        {
            return Err(SetupError::DuplicateSource {
                id: existing as u8,
            });
        }

        self.sources
            .push(source)
            .map_err(|_| SetupError::CapacityExceeded { capacity: N })?;
        debug!("listener {} registered", id.0);
        Ok(Listener { id })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Suspends until at least one bound source is ready, then consumes and
    /// returns every ready source.
    pub async fn wait_any(&mut self) -> EventMask {
        let ready = self.take_ready();
        if !ready.is_empty() {
            return ready;
        }

        // Unused slots never complete
        let sources = &self.sources;
        let waits: [_; N] = core::array::from_fn(|index| {
            let source = sources.get(index);
            async move {
                match source {
                    Some(source) => source.pending.wait().await,
                    None => pending::<()>().await,
                }
            }
        });
        let ((), first) = select_array(waits).await;

        // Sources raised together with the first one are delivered too
        let mut ready = self.take_ready();
        ready.insert(EventId::new(first as u8));
        ready
    }

    /// Consumes every pending notification without suspending
    fn take_ready(&self) -> EventMask {
        let mut ready = EventMask::empty();
        for (index, source) in self.sources.iter().enumerate() {
            if source.pending.try_take().is_some() {
                ready.insert(EventId::new(index as u8));
            }
        }
        ready
    }
}

impl<M: RawMutex, const N: usize> Default for EventRegistry<'_, M, N> {
    fn default() -> Self {
        Self::new()
    }
}
