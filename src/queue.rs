//! Event queue.
//!
//! [`EventQueue`] collects events from every source registered with it, in
//! arrival order. It is the only place where events cross threads: sources may
//! emit from anywhere, while popping and waiting happens on the owning thread.
//!
//! Time-driven sources (timers) have no thread of their own. The queue pumps
//! them whenever it is queried, and a blocking wait sleeps until the earliest
//! timer deadline.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::source::{EventSource, EventSourceHandle, QueueLink, SourceId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct EventQueue {
    link: Arc<QueueLink>,
    rx: flume::Receiver<Event>,
    /// Events already pulled off the channel (peeked, or kept by an unregister).
    pending: VecDeque<Event>,
    sources: Vec<EventSourceHandle>,
}

impl EventQueue {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let (tx, rx) = flume::unbounded();
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        log::info!("Event queue {id} created.");
        Self {
            link: Arc::new(QueueLink {
                id,
                paused: AtomicBool::new(false),
                tx,
            }),
            rx,
            pending: VecDeque::new(),
            sources: Vec::new(),
        }
    }

    /// Registers `source` with this queue. Returns `false` if it already was.
    pub fn register_source<S: EventSource + ?Sized>(&mut self, source: &S) -> bool {
        let handle = source.event_source();
        if !handle.attach(&self.link) {
            return false;
        }
        log::debug!(
            "Queue {}: registered source {:?} ({})",
            self.link.id,
            handle.id(),
            handle.label()
        );
        self.sources.push(handle.clone());
        true
    }

    /// Unregisters `source`. Events it already posted are removed from the queue.
    pub fn unregister_source<S: EventSource + ?Sized>(&mut self, source: &S) -> bool {
        let handle = source.event_source();
        let id = handle.id();
        let before = self.sources.len();
        self.sources.retain(|s| s.id() != id);
        if self.sources.len() == before {
            return false;
        }
        handle.detach(self.link.id);
        self.collect();
        self.pending.retain(|e| e.source() != id);
        log::debug!("Queue {}: unregistered source {id:?}", self.link.id);
        true
    }

    pub fn is_source_registered<S: EventSource + ?Sized>(&self, source: &S) -> bool {
        source.event_source().is_attached(self.link.id)
    }

    /// Ids of all registered sources, in registration order.
    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.iter().map(EventSourceHandle::id)
    }

    pub fn is_empty(&self) -> bool {
        self.pump();
        self.pending.is_empty() && self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pump();
        self.pending.len() + self.rx.len()
    }

    /// Pops the oldest event, if any.
    pub fn get_next_event(&mut self) -> Option<Event> {
        self.pump();
        self.pending.pop_front().or_else(|| self.rx.try_recv().ok())
    }

    /// Looks at the oldest event without removing it.
    pub fn peek_next_event(&mut self) -> Option<&Event> {
        self.pump();
        if self.pending.is_empty() {
            let next = self.rx.try_recv().ok()?;
            self.pending.push_back(next);
        }
        self.pending.front()
    }

    /// Discards the oldest event. Returns `false` if the queue was empty.
    pub fn drop_next_event(&mut self) -> bool {
        self.get_next_event().is_some()
    }

    /// Discards every queued event.
    pub fn flush(&mut self) {
        self.pump();
        let dropped = self.pending.len() + self.rx.drain().count();
        self.pending.clear();
        log::trace!("Queue {}: flushed {dropped} event(s)", self.link.id);
    }

    /// Drains the events queued right now. Events posted while iterating are
    /// picked up too.
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        std::iter::from_fn(move || self.get_next_event())
    }

    /// Blocks until an event arrives.
    ///
    /// Fails with [`Error::WaitWouldBlockForever`] when nothing is queued and no
    /// source is registered.
    pub fn wait_for_event(&mut self) -> Result<Event> {
        loop {
            let next_tick = self.pump();
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }
            if self.sources.is_empty() && self.rx.is_empty() {
                return Err(Error::WaitWouldBlockForever);
            }
            let received = match next_tick {
                Some(deadline) => self.rx.recv_deadline(deadline),
                None => self
                    .rx
                    .recv()
                    .map_err(|_| flume::RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(event) => return Ok(event),
                Err(flume::RecvTimeoutError::Timeout) => continue,
                // The queue owns the sending side, so this cannot happen while
                // `self` is alive.
                Err(flume::RecvTimeoutError::Disconnected) => {
                    return Err(Error::WaitWouldBlockForever)
                }
            }
        }
    }

    /// Waits at most `timeout` for an event.
    pub fn wait_for_event_timed(&mut self, timeout: Duration) -> Option<Event> {
        self.wait_for_event_until(Instant::now() + timeout)
    }

    /// Waits until `deadline` for an event.
    pub fn wait_for_event_until(&mut self, deadline: Instant) -> Option<Event> {
        loop {
            let next_tick = self.pump();
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if Instant::now() >= deadline {
                return self.rx.try_recv().ok();
            }
            let until = next_tick.map_or(deadline, |t| t.min(deadline));
            match self.rx.recv_deadline(until) {
                Ok(event) => return Some(event),
                Err(flume::RecvTimeoutError::Timeout) => continue,
                Err(flume::RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// While paused, events posted to this queue are dropped.
    pub fn pause(&self, paused: bool) {
        self.link.paused.store(paused, Ordering::Release);
        log::debug!("Queue {}: paused = {paused}", self.link.id);
    }

    pub fn is_paused(&self) -> bool {
        self.link.paused.load(Ordering::Acquire)
    }

    /// Lets time-driven sources emit what is due; returns the earliest next deadline.
    fn pump(&self) -> Option<Instant> {
        let now = Instant::now();
        self.sources.iter().filter_map(|s| s.pump(now)).min()
    }

    fn collect(&mut self) {
        self.pending.extend(self.rx.drain());
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        for source in &self.sources {
            source.detach(self.link.id);
        }
        log::debug!("Event queue {} destroyed.", self.link.id);
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("id", &self.link.id)
            .field("sources", &self.sources.len())
            .field("queued", &(self.pending.len() + self.rx.len()))
            .field("paused", &self.is_paused())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventType, Payload};

    #[test]
    fn events_come_out_in_order() {
        let src = EventSourceHandle::new("test");
        let mut q = EventQueue::new();
        assert!(q.register_source(&src));
        assert!(!q.register_source(&src));

        src.emit(EventType::KEY_DOWN, Payload::None);
        src.emit(EventType::KEY_UP, Payload::None);
        assert_eq!(q.len(), 2);
        assert_eq!(q.get_next_event().unwrap().kind(), EventType::KEY_DOWN);
        assert_eq!(q.get_next_event().unwrap().kind(), EventType::KEY_UP);
        assert!(q.get_next_event().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn peek_keeps_the_event() {
        let src = EventSourceHandle::new("test");
        let mut q = EventQueue::new();
        q.register_source(&src);
        src.emit(EventType::TIMER, Payload::None);
        src.emit(EventType::DISPLAY_CLOSE, Payload::None);

        assert_eq!(q.peek_next_event().unwrap().kind(), EventType::TIMER);
        assert_eq!(q.peek_next_event().unwrap().kind(), EventType::TIMER);
        assert!(q.drop_next_event());
        assert_eq!(q.get_next_event().unwrap().kind(), EventType::DISPLAY_CLOSE);
        assert!(!q.drop_next_event());
    }

    #[test]
    fn unregister_removes_pending_events_of_that_source() {
        let a = EventSourceHandle::new("a");
        let b = EventSourceHandle::new("b");
        let mut q = EventQueue::new();
        q.register_source(&a);
        q.register_source(&b);
        a.emit(EventType::KEY_DOWN, Payload::None);
        b.emit(EventType::MOUSE_AXES, Payload::None);
        a.emit(EventType::KEY_UP, Payload::None);

        assert!(q.unregister_source(&a));
        assert!(!q.is_source_registered(&a));
        assert_eq!(q.len(), 1);
        assert_eq!(q.get_next_event().unwrap().source(), b.id());

        a.emit(EventType::KEY_DOWN, Payload::None);
        assert!(q.is_empty());
    }

    #[test]
    fn paused_queue_drops_events() {
        let src = EventSourceHandle::new("test");
        let mut q = EventQueue::new();
        q.register_source(&src);
        q.pause(true);
        src.emit(EventType::KEY_DOWN, Payload::None);
        assert!(q.is_empty());
        q.pause(false);
        src.emit(EventType::KEY_DOWN, Payload::None);
        assert!(q.get_next_event().is_some());
    }

    #[test]
    fn wait_without_sources_fails_fast() {
        let mut q = EventQueue::new();
        assert!(matches!(
            q.wait_for_event(),
            Err(Error::WaitWouldBlockForever)
        ));
    }

    #[test]
    fn timed_wait_times_out() {
        let src = EventSourceHandle::new("idle");
        let mut q = EventQueue::new();
        q.register_source(&src);
        let start = Instant::now();
        assert!(q.wait_for_event_timed(Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn wait_receives_event_from_another_thread() {
        let src = EventSourceHandle::new("remote");
        let mut q = EventQueue::new();
        q.register_source(&src);
        let remote = src.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            remote.emit(EventType::DISPLAY_CLOSE, Payload::None);
        });
        let ev = q.wait_for_event().expect("event from thread");
        assert_eq!(ev.kind(), EventType::DISPLAY_CLOSE);
        handle.join().expect("thread join");
    }

    #[test]
    fn flush_discards_everything() {
        let src = EventSourceHandle::new("test");
        let mut q = EventQueue::new();
        q.register_source(&src);
        for _ in 0..5 {
            src.emit(EventType::TIMER, Payload::None);
        }
        q.peek_next_event();
        q.flush();
        assert!(q.is_empty());
    }

    #[test]
    fn dropping_the_queue_detaches_sources() {
        let src = EventSourceHandle::new("test");
        {
            let mut q = EventQueue::new();
            q.register_source(&src);
            assert_eq!(src.queue_count(), 1);
        }
        assert_eq!(src.queue_count(), 0);
    }

    #[test]
    fn one_event_reaches_every_queue() {
        let src = EventSourceHandle::new("test");
        let mut q1 = EventQueue::new();
        let mut q2 = EventQueue::new();
        q1.register_source(&src);
        q2.register_source(&src);
        assert_eq!(src.emit(EventType::KEY_CHAR, Payload::None), 2);
        assert!(q1.get_next_event().is_some());
        assert!(q2.get_next_event().is_some());
    }
}
