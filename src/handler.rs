//! Event handlers.
//!
//! The dispatcher stores every handler as an [`EventHandler`], a boxed closure
//! with one canonical signature: `FnMut(&Event, &DispatchInfo)`. Shorter
//! closures are adapted through [`IntoEventHandler`]:
//!
//! ```
//! use mmevents::{DispatchInfo, Event, EventHandler};
//!
//! let _full = EventHandler::new(|ev: &Event, info: &DispatchInfo| {
//!     println!("{:?} matched {:?}", ev.kind(), info.coordinate());
//! });
//! let _event_only = EventHandler::new(|ev: &Event| println!("{:?}", ev.kind()));
//! let _no_args = EventHandler::new(|| println!("something happened"));
//! ```
//!
//! [`GenericEventHandler`] is the strongly-typed flavour: it extracts one payload
//! type before calling the closure.

use crate::dispatcher::HandlerCoordinate;
use crate::event::{DisplayEvent, Event, JoystickEvent, KeyboardEvent, MouseEvent, TimerEvent};
use crate::user_event::UserEventType;

/// What the dispatcher matched when it invoked a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchInfo {
    coordinate: HandlerCoordinate,
    value: Option<i64>,
}

impl DispatchInfo {
    pub(crate) fn new(coordinate: HandlerCoordinate) -> Self {
        Self {
            coordinate,
            value: coordinate.value().map(|(_, v)| v),
        }
    }

    pub fn coordinate(&self) -> HandlerCoordinate {
        self.coordinate
    }

    /// Discretized value, for value-level matches.
    pub fn value(&self) -> Option<i64> {
        self.value
    }
}

/// Type-erased handler.
pub struct EventHandler {
    f: Box<dyn FnMut(&Event, &DispatchInfo)>,
}

impl EventHandler {
    pub fn new<M, F: IntoEventHandler<M>>(f: F) -> Self {
        f.into_handler()
    }

    pub fn call(&mut self, event: &Event, info: &DispatchInfo) {
        (self.f)(event, info)
    }
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventHandler(..)")
    }
}

/// Closure shapes accepted wherever a handler is expected.
///
/// `Marker` only disambiguates the shapes; callers never name it.
pub trait IntoEventHandler<Marker> {
    fn into_handler(self) -> EventHandler;
}

#[doc(hidden)]
pub struct FullSignature;
#[doc(hidden)]
pub struct EventOnly;
#[doc(hidden)]
pub struct NoArgs;
#[doc(hidden)]
pub struct Typed;

impl<F> IntoEventHandler<FullSignature> for F
where
    F: FnMut(&Event, &DispatchInfo) + 'static,
{
    fn into_handler(self) -> EventHandler {
        EventHandler { f: Box::new(self) }
    }
}

impl<F> IntoEventHandler<EventOnly> for F
where
    F: FnMut(&Event) + 'static,
{
    fn into_handler(mut self) -> EventHandler {
        EventHandler {
            f: Box::new(move |ev, _| self(ev)),
        }
    }
}

impl<F> IntoEventHandler<NoArgs> for F
where
    F: FnMut() + 'static,
{
    fn into_handler(mut self) -> EventHandler {
        EventHandler {
            f: Box::new(move |_, _| self()),
        }
    }
}

impl IntoEventHandler<()> for EventHandler {
    fn into_handler(self) -> EventHandler {
        self
    }
}

/// Payload types a [`GenericEventHandler`] can extract from built-in events.
pub trait EventPayload: 'static {
    fn extract(event: &Event) -> Option<&Self>;
}

impl EventPayload for KeyboardEvent {
    fn extract(event: &Event) -> Option<&Self> {
        event.keyboard()
    }
}

impl EventPayload for MouseEvent {
    fn extract(event: &Event) -> Option<&Self> {
        event.mouse()
    }
}

impl EventPayload for DisplayEvent {
    fn extract(event: &Event) -> Option<&Self> {
        event.display()
    }
}

impl EventPayload for TimerEvent {
    fn extract(event: &Event) -> Option<&Self> {
        event.timer()
    }
}

impl EventPayload for JoystickEvent {
    fn extract(event: &Event) -> Option<&Self> {
        event.joystick()
    }
}

fn extract_user<T: UserEventType>(event: &Event) -> Option<&T> {
    event.user::<T>().ok()
}

/// Handler bound to one payload type `P`.
///
/// Events whose payload is not a `P` are skipped with a warning; this only
/// happens when the handler is registered at a coordinate that admits other
/// payloads (typically the catch-all).
pub struct GenericEventHandler<P: 'static> {
    extract: fn(&Event) -> Option<&P>,
    f: Box<dyn FnMut(&P, &Event)>,
}

impl<P: EventPayload> GenericEventHandler<P> {
    pub fn new(mut f: impl FnMut(&P) + 'static) -> Self {
        Self {
            extract: P::extract,
            f: Box::new(move |p, _| f(p)),
        }
    }

    /// Like [`new`](Self::new) but the closure also sees the whole event.
    pub fn with_event(f: impl FnMut(&P, &Event) + 'static) -> Self {
        Self {
            extract: P::extract,
            f: Box::new(f),
        }
    }
}

impl<P: UserEventType> GenericEventHandler<P> {
    /// Handler for user events carrying a `P`.
    pub fn user(mut f: impl FnMut(&P) + 'static) -> Self {
        Self {
            extract: extract_user::<P>,
            f: Box::new(move |p, _| f(p)),
        }
    }
}

impl<P: 'static> IntoEventHandler<Typed> for GenericEventHandler<P> {
    fn into_handler(self) -> EventHandler {
        let Self { extract, mut f } = self;
        EventHandler {
            f: Box::new(move |ev, _| match extract(ev) {
                Some(payload) => f(payload, ev),
                None => log::warn!(
                    "Typed handler for `{}` skipped event {:?}",
                    std::any::type_name::<P>(),
                    ev.kind()
                ),
            }),
        }
    }
}
