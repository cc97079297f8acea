//! Event sources.
//!
//! A source is anything that can post events: the built-in input sources, timers,
//! and [`UserEventSource`](crate::sources::UserEventSource). Every source owns an
//! [`EventSourceHandle`], and anything that exposes one implements [`EventSource`]
//! so it can be registered with a [`EventQueue`](crate::queue::EventQueue).
//!
//! # Semantics
//! - A source may be registered with any number of queues. Each emitted event is
//!   copied into every queue it is registered with, in registration order.
//! - Paused queues silently drop incoming events.
//! - Queues that were dropped are pruned on the next emit.
//! - Sources never own the events they produce; once posted, an event belongs
//!   to the queue.

use crate::event::{Event, EventType, Payload};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

/// Process-unique identifier of an event source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

impl SourceId {
    /// Marks events that were built directly rather than emitted by a source.
    pub const NONE: SourceId = SourceId(0);

    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SourceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Capability of producing events.
pub trait EventSource {
    fn event_source(&self) -> &EventSourceHandle;

    fn source_id(&self) -> SourceId {
        self.event_source().id()
    }
}

/// Receiving end a source writes into. Owned by the queue; sources keep a `Weak`.
pub(crate) struct QueueLink {
    pub(crate) id: u64,
    pub(crate) paused: AtomicBool,
    pub(crate) tx: flume::Sender<Event>,
}

/// Time-driven sources (timers) generate their events when a queue pumps them.
pub(crate) trait Pump: Send + Sync {
    /// Emits everything due at `now` and returns the next deadline, if any.
    fn pump(&self, source: &EventSourceHandle, now: Instant) -> Option<Instant>;
}

impl<P: Pump + ?Sized> Pump for Arc<P> {
    fn pump(&self, source: &EventSourceHandle, now: Instant) -> Option<Instant> {
        (**self).pump(source, now)
    }
}

struct SourceCore {
    id: SourceId,
    label: &'static str,
    sinks: Mutex<Vec<Weak<QueueLink>>>,
    pump: Option<Box<dyn Pump>>,
}

/// Shared handle to a source. Cloning yields another handle to the same source.
#[derive(Clone)]
pub struct EventSourceHandle {
    core: Arc<SourceCore>,
}

impl std::fmt::Debug for EventSourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSourceHandle")
            .field("id", &self.core.id)
            .field("label", &self.core.label)
            .field("queues", &self.queue_count())
            .finish()
    }
}

impl EventSourceHandle {
    pub fn new(label: &'static str) -> Self {
        Self::build(label, None)
    }

    pub(crate) fn with_pump(label: &'static str, pump: Box<dyn Pump>) -> Self {
        Self::build(label, Some(pump))
    }

    fn build(label: &'static str, pump: Option<Box<dyn Pump>>) -> Self {
        let core = SourceCore {
            id: SourceId::next(),
            label,
            sinks: Mutex::new(Vec::new()),
            pump,
        };
        log::debug!("Created event source {:?} ({label})", core.id);
        Self {
            core: Arc::new(core),
        }
    }

    #[inline]
    pub fn id(&self) -> SourceId {
        self.core.id
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        self.core.label
    }

    /// Number of live queues this source is registered with.
    pub fn queue_count(&self) -> usize {
        self.sinks()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Builds an event of type `kind` and posts it. Returns the number of
    /// queues that received a copy.
    pub fn emit(&self, kind: EventType, payload: Payload) -> usize {
        self.emit_event(Event::new(kind, payload))
    }

    /// Posts a prebuilt event, stamping it with this source's id.
    pub fn emit_event(&self, event: Event) -> usize {
        let event = event.with_source(self.core.id);
        let mut sinks = self.sinks();
        let mut delivered = 0;
        sinks.retain(|weak| {
            let Some(link) = weak.upgrade() else {
                return false;
            };
            if link.paused.load(Ordering::Acquire) {
                return true;
            }
            // The receiver lives as long as the link, so a send error means the
            // queue is being torn down.
            if link.tx.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                false
            }
        });
        drop(sinks);

        #[cfg(feature = "debug-log")]
        log::trace!(
            "[{}] emitted {:?} to {delivered} queue(s)",
            self.core.label,
            event.kind()
        );

        delivered
    }

    pub(crate) fn attach(&self, link: &Arc<QueueLink>) -> bool {
        let mut sinks = self.sinks();
        let already = sinks
            .iter()
            .filter_map(Weak::upgrade)
            .any(|l| l.id == link.id);
        if !already {
            sinks.push(Arc::downgrade(link));
        }
        !already
    }

    pub(crate) fn detach(&self, queue_id: u64) {
        self.sinks()
            .retain(|w| w.upgrade().is_some_and(|l| l.id != queue_id));
    }

    pub(crate) fn is_attached(&self, queue_id: u64) -> bool {
        self.sinks()
            .iter()
            .filter_map(Weak::upgrade)
            .any(|l| l.id == queue_id)
    }

    pub(crate) fn pump(&self, now: Instant) -> Option<Instant> {
        self.core.pump.as_ref().and_then(|p| p.pump(self, now))
    }

    fn sinks(&self) -> MutexGuard<'_, Vec<Weak<QueueLink>>> {
        lock(&self.core.sinks)
    }
}

/// Locks `m`, ignoring poisoning. Guarded data in this crate is always left
/// consistent between statements, so a panicking holder cannot corrupt it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl EventSource for EventSourceHandle {
    fn event_source(&self) -> &EventSourceHandle {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: u64) -> (Arc<QueueLink>, flume::Receiver<Event>) {
        let (tx, rx) = flume::unbounded();
        let link = Arc::new(QueueLink {
            id,
            paused: AtomicBool::new(false),
            tx,
        });
        (link, rx)
    }

    #[test]
    fn ids_are_unique() {
        let a = EventSourceHandle::new("a");
        let b = EventSourceHandle::new("b");
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), SourceId::NONE);
    }

    #[test]
    fn emit_broadcasts_and_stamps_source() {
        let src = EventSourceHandle::new("test");
        let (l1, r1) = link(1);
        let (l2, r2) = link(2);
        assert!(src.attach(&l1));
        assert!(src.attach(&l2));
        assert!(!src.attach(&l1));

        assert_eq!(src.emit(EventType::DISPLAY_CLOSE, Payload::None), 2);
        let e1 = r1.try_recv().expect("queue 1 got a copy");
        let e2 = r2.try_recv().expect("queue 2 got a copy");
        assert_eq!(e1.source(), src.id());
        assert_eq!(e2.kind(), EventType::DISPLAY_CLOSE);
    }

    #[test]
    fn paused_links_skip_events() {
        let src = EventSourceHandle::new("test");
        let (l1, r1) = link(1);
        src.attach(&l1);
        l1.paused.store(true, Ordering::Release);
        assert_eq!(src.emit(EventType::TIMER, Payload::None), 0);
        assert!(r1.is_empty());
        assert!(src.is_attached(1));
    }

    #[test]
    fn dropped_links_are_pruned() {
        let src = EventSourceHandle::new("test");
        let (l1, _r1) = link(1);
        src.attach(&l1);
        assert_eq!(src.queue_count(), 1);
        drop(l1);
        assert_eq!(src.emit(EventType::TIMER, Payload::None), 0);
        assert_eq!(src.queue_count(), 0);
    }

    #[test]
    fn detach_removes_only_that_queue() {
        let src = EventSourceHandle::new("test");
        let (l1, _r1) = link(1);
        let (l2, _r2) = link(2);
        src.attach(&l1);
        src.attach(&l2);
        src.detach(1);
        assert!(!src.is_attached(1));
        assert!(src.is_attached(2));
    }
}
