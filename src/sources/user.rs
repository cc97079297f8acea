//! Application-owned event source.
//!
//! [`UserEventSource`] posts [`UserEventType`] payloads, or any prebuilt record,
//! to the queues it is registered with.

use crate::error::Result;
use crate::event::{Event, EventType, Payload};
use crate::source::{EventSource, EventSourceHandle};
use crate::user_event::UserEventType;

#[derive(Clone, Debug)]
pub struct UserEventSource {
    handle: EventSourceHandle,
}

impl UserEventSource {
    pub fn new() -> Self {
        Self {
            handle: EventSourceHandle::new("user"),
        }
    }

    /// Posts `payload` under `T`'s type tag. Returns the number of queues reached.
    ///
    /// With no queue registered the payload is dropped right away.
    pub fn emit<T: UserEventType>(&self, payload: T) -> Result<usize> {
        let event = Event::user_event(payload)?;
        log::trace!(
            "[user] emitting {:?} ({:?})",
            event.kind(),
            event.user_storage()
        );
        Ok(self.handle.emit_event(event))
    }

    /// Posts a raw event of any type.
    pub fn emit_event(&self, kind: EventType, payload: Payload) -> usize {
        self.handle.emit(kind, payload)
    }
}

impl Default for UserEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for UserEventSource {
    fn event_source(&self) -> &EventSourceHandle {
        &self.handle
    }
}
