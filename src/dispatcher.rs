//! Value-based event dispatch.
//!
//! [`EventDispatcher`] routes each event to at most one handler, looked up in
//! three steps:
//!
//! 1. **Value match.** For every discretizer that has at least one handler
//!    registered for the event's type (in discretizer registration order), compute
//!    the event's value and look up `(type, discretizer, value)`. The first hit
//!    wins.
//! 2. **Type match.** `(type, no value)`.
//! 3. **Catch-all.**
//!
//! Only discretizers with a handler for the event's type are evaluated, so the cost
//! of step 1 is linear in the number of *relevant* discretizers, not in the number
//! registered.
//!
//! Registering a handler at a coordinate that already has one replaces it; the
//! old handler is handed back to the caller.

use crate::discretizer::{self, Discretizer, DiscretizerId};
use crate::error::{Error, Result};
use crate::event::{Event, EventType};
use crate::handler::{DispatchInfo, EventHandler, EventPayload, GenericEventHandler, IntoEventHandler};
use crate::user_event::{user_event_type, UserEventType};
use std::collections::HashMap;

/// Key of the handler table.
///
/// Built only through [`catch_all`](Self::catch_all), [`of_type`](Self::of_type)
/// and [`of_value`](Self::of_value): a coordinate with a value always has a type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerCoordinate {
    event_type: Option<EventType>,
    value: Option<(DiscretizerId, i64)>,
}

impl HandlerCoordinate {
    pub const fn catch_all() -> Self {
        Self {
            event_type: None,
            value: None,
        }
    }

    pub const fn of_type(event_type: EventType) -> Self {
        Self {
            event_type: Some(event_type),
            value: None,
        }
    }

    pub const fn of_value(event_type: EventType, discretizer: DiscretizerId, value: i64) -> Self {
        Self {
            event_type: Some(event_type),
            value: Some((discretizer, value)),
        }
    }

    pub fn event_type(&self) -> Option<EventType> {
        self.event_type
    }

    pub fn value(&self) -> Option<(DiscretizerId, i64)> {
        self.value
    }

    pub fn is_catch_all(&self) -> bool {
        self.event_type.is_none()
    }

    pub fn is_type_level(&self) -> bool {
        self.event_type.is_some() && self.value.is_none()
    }

    pub fn is_value_level(&self) -> bool {
        self.value.is_some()
    }
}

/// Outcome of [`EventDispatcher::dispatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchResult {
    Handled,
    NotHandled,
}

impl DispatchResult {
    pub fn is_handled(self) -> bool {
        self == DispatchResult::Handled
    }
}

pub struct EventDispatcher {
    discretizers: Vec<Discretizer>,
    handlers: HashMap<HandlerCoordinate, EventHandler>,
    /// Discretizers with at least one value handler, per event type, sorted by id.
    relevant: HashMap<EventType, Vec<DiscretizerId>>,
}

impl EventDispatcher {
    /// Dispatcher with the built-in discretizers (see [`crate::discretizer`]).
    pub fn new() -> Self {
        Self {
            discretizers: discretizer::builtin(),
            handlers: HashMap::new(),
            relevant: HashMap::new(),
        }
    }

    /// Dispatcher with no discretizers at all.
    pub fn bare() -> Self {
        Self {
            discretizers: Vec::new(),
            handlers: HashMap::new(),
            relevant: HashMap::new(),
        }
    }

    /// Registers a discretizer and returns its id.
    pub fn add_discretizer(
        &mut self,
        name: impl Into<String>,
        func: impl Fn(&Event) -> Option<i64> + 'static,
    ) -> DiscretizerId {
        let id = DiscretizerId(self.discretizers.len());
        let d = Discretizer::new(id, name, func);
        log::debug!("Registered discretizer {id:?} ({})", d.name());
        self.discretizers.push(d);
        id
    }

    pub fn discretizer(&self, id: DiscretizerId) -> Option<&Discretizer> {
        self.discretizers.get(id.0)
    }

    pub fn discretizers(&self) -> &[Discretizer] {
        &self.discretizers
    }

    /// Installs `handler` at `coordinate`, returning the handler it replaced.
    ///
    /// Fails if the coordinate names a discretizer this dispatcher does not have.
    pub fn set_handler<M>(
        &mut self,
        coordinate: HandlerCoordinate,
        handler: impl IntoEventHandler<M>,
    ) -> Result<Option<EventHandler>> {
        if let Some((d, _)) = coordinate.value {
            if d.0 >= self.discretizers.len() {
                return Err(Error::UnknownDiscretizer(d));
            }
        }
        if let (Some(t), Some((d, _))) = (coordinate.event_type, coordinate.value) {
            let ids = self.relevant.entry(t).or_default();
            if let Err(pos) = ids.binary_search(&d) {
                ids.insert(pos, d);
            }
        }
        let previous = self.handlers.insert(coordinate, handler.into_handler());
        if previous.is_some() {
            log::debug!("Replaced handler at {coordinate:?}");
        } else {
            log::debug!("Installed handler at {coordinate:?}");
        }
        Ok(previous)
    }

    /// Removes the handler at `coordinate`.
    pub fn remove_handler(&mut self, coordinate: HandlerCoordinate) -> Option<EventHandler> {
        let removed = self.handlers.remove(&coordinate)?;
        if let (Some(t), Some((d, _))) = (coordinate.event_type, coordinate.value) {
            let still_used = self
                .handlers
                .keys()
                .any(|c| c.event_type == Some(t) && c.value.is_some_and(|(other, _)| other == d));
            if !still_used {
                if let Some(ids) = self.relevant.get_mut(&t) {
                    ids.retain(|&i| i != d);
                    if ids.is_empty() {
                        self.relevant.remove(&t);
                    }
                }
            }
        }
        Some(removed)
    }

    pub fn has_handler(&self, coordinate: HandlerCoordinate) -> bool {
        self.handlers.contains_key(&coordinate)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Removes every handler. Discretizers stay registered.
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
        self.relevant.clear();
    }

    /// Discretizers evaluated for events of type `event_type`, in order.
    pub fn relevant_discretizers(&self, event_type: EventType) -> &[DiscretizerId] {
        self.relevant
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ---- convenience registration ----

    pub fn set_catch_all<M>(&mut self, handler: impl IntoEventHandler<M>) -> Option<EventHandler> {
        self.insert_infallible(HandlerCoordinate::catch_all(), handler)
    }

    pub fn on_type<M>(
        &mut self,
        event_type: EventType,
        handler: impl IntoEventHandler<M>,
    ) -> Option<EventHandler> {
        self.insert_infallible(HandlerCoordinate::of_type(event_type), handler)
    }

    pub fn on_value<M>(
        &mut self,
        event_type: EventType,
        discretizer: DiscretizerId,
        value: i64,
        handler: impl IntoEventHandler<M>,
    ) -> Result<Option<EventHandler>> {
        self.set_handler(
            HandlerCoordinate::of_value(event_type, discretizer, value),
            handler,
        )
    }

    pub fn on_key_down<M>(
        &mut self,
        keycode: u32,
        handler: impl IntoEventHandler<M>,
    ) -> Result<Option<EventHandler>> {
        self.on_value(
            EventType::KEY_DOWN,
            DiscretizerId::KEYCODE,
            i64::from(keycode),
            handler,
        )
    }

    pub fn on_key_up<M>(
        &mut self,
        keycode: u32,
        handler: impl IntoEventHandler<M>,
    ) -> Result<Option<EventHandler>> {
        self.on_value(
            EventType::KEY_UP,
            DiscretizerId::KEYCODE,
            i64::from(keycode),
            handler,
        )
    }

    pub fn on_key_char<M>(
        &mut self,
        keycode: u32,
        handler: impl IntoEventHandler<M>,
    ) -> Result<Option<EventHandler>> {
        self.on_value(
            EventType::KEY_CHAR,
            DiscretizerId::KEYCODE,
            i64::from(keycode),
            handler,
        )
    }

    pub fn on_mouse_button_down<M>(
        &mut self,
        button: u32,
        handler: impl IntoEventHandler<M>,
    ) -> Result<Option<EventHandler>> {
        self.on_value(
            EventType::MOUSE_BUTTON_DOWN,
            DiscretizerId::MOUSE_BUTTON,
            i64::from(button),
            handler,
        )
    }

    pub fn on_mouse_button_up<M>(
        &mut self,
        button: u32,
        handler: impl IntoEventHandler<M>,
    ) -> Result<Option<EventHandler>> {
        self.on_value(
            EventType::MOUSE_BUTTON_UP,
            DiscretizerId::MOUSE_BUTTON,
            i64::from(button),
            handler,
        )
    }

    pub fn on_joystick_button_down<M>(
        &mut self,
        button: i32,
        handler: impl IntoEventHandler<M>,
    ) -> Result<Option<EventHandler>> {
        self.on_value(
            EventType::JOYSTICK_BUTTON_DOWN,
            DiscretizerId::JOYSTICK_BUTTON,
            i64::from(button),
            handler,
        )
    }

    /// Typed handler for all events of `event_type` carrying a `P`.
    pub fn on_payload<P: EventPayload>(
        &mut self,
        event_type: EventType,
        f: impl FnMut(&P) + 'static,
    ) -> Option<EventHandler> {
        self.on_type(event_type, GenericEventHandler::<P>::new(f))
    }

    /// Typed handler for user events of type `T`.
    pub fn on_user<T: UserEventType>(
        &mut self,
        f: impl FnMut(&T) + 'static,
    ) -> Result<Option<EventHandler>> {
        let event_type = user_event_type::<T>()?;
        Ok(self.on_type(event_type, GenericEventHandler::<T>::user(f)))
    }

    fn insert_infallible<M>(
        &mut self,
        coordinate: HandlerCoordinate,
        handler: impl IntoEventHandler<M>,
    ) -> Option<EventHandler> {
        debug_assert!(coordinate.value.is_none());
        let previous = self.handlers.insert(coordinate, handler.into_handler());
        if previous.is_some() {
            log::debug!("Replaced handler at {coordinate:?}");
        }
        previous
    }

    // ---- dispatch ----

    /// Routes `event` to the best matching handler.
    pub fn dispatch(&mut self, event: &Event) -> DispatchResult {
        let kind = event.kind();

        if let Some(ids) = self.relevant.get(&kind) {
            for &id in ids {
                let Some(value) = self
                    .discretizers
                    .get(id.0)
                    .and_then(|d| d.discretize(event))
                else {
                    continue;
                };
                let coordinate = HandlerCoordinate::of_value(kind, id, value);
                if let Some(handler) = self.handlers.get_mut(&coordinate) {
                    Self::invoke(handler, event, coordinate);
                    return DispatchResult::Handled;
                }
            }
        }

        for coordinate in [HandlerCoordinate::of_type(kind), HandlerCoordinate::catch_all()] {
            if let Some(handler) = self.handlers.get_mut(&coordinate) {
                Self::invoke(handler, event, coordinate);
                return DispatchResult::Handled;
            }
        }

        #[cfg(feature = "debug-log")]
        log::trace!("[dispatch] {kind:?} not handled");
        DispatchResult::NotHandled
    }

    fn invoke(handler: &mut EventHandler, event: &Event, coordinate: HandlerCoordinate) {
        #[cfg(feature = "debug-log")]
        log::trace!("[dispatch] {:?} -> {coordinate:?}", event.kind());
        handler.call(event, &DispatchInfo::new(coordinate));
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("discretizers", &self.discretizers)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
