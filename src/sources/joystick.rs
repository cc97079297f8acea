//! Joystick event source.
//!
//! ## Value conventions
//! - Axis positions are clamped to `[-1.0, 1.0]`.
//! - Buttons are device-local indices starting at `0`.

use crate::event::{EventType, JoystickEvent, Payload};
use crate::source::{lock, EventSource, EventSourceHandle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Last reported position of one axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisReading {
    pub stick: i32,
    pub axis: i32,
    pub pos: f32,
}

/// Last reported axis positions and held buttons.
///
/// `axes` holds one reading per `(stick, axis)`, sorted by stick then axis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JoystickState {
    pub buttons: BTreeSet<i32>,
    pub axes: Vec<AxisReading>,
}

impl JoystickState {
    pub fn axis(&self, stick: i32, axis: i32) -> f32 {
        self.find(stick, axis)
            .map(|i| self.axes[i].pos)
            .unwrap_or(0.0)
    }

    fn find(&self, stick: i32, axis: i32) -> Result<usize, usize> {
        self.axes
            .binary_search_by_key(&(stick, axis), |r| (r.stick, r.axis))
    }

    fn record(&mut self, stick: i32, axis: i32, pos: f32) {
        match self.find(stick, axis) {
            Ok(i) => self.axes[i].pos = pos,
            Err(i) => self.axes.insert(i, AxisReading { stick, axis, pos }),
        }
    }

    pub fn is_button_down(&self, button: i32) -> bool {
        self.buttons.contains(&button)
    }
}

#[derive(Debug)]
pub struct Joystick {
    handle: EventSourceHandle,
    index: u32,
    state: Mutex<JoystickState>,
}

impl Joystick {
    pub fn new(index: u32) -> Self {
        Self {
            handle: EventSourceHandle::new("joystick"),
            index,
            state: Mutex::new(JoystickState::default()),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn axis(&self, stick: i32, axis: i32, pos: f32) {
        let pos = pos.clamp(-1.0, 1.0);
        lock(&self.state).record(stick, axis, pos);
        self.post(
            EventType::JOYSTICK_AXIS,
            JoystickEvent {
                stick,
                axis,
                pos,
                ..self.blank()
            },
        );
    }

    pub fn button_down(&self, button: i32) {
        lock(&self.state).buttons.insert(button);
        self.post(
            EventType::JOYSTICK_BUTTON_DOWN,
            JoystickEvent {
                button,
                ..self.blank()
            },
        );
    }

    pub fn button_up(&self, button: i32) {
        lock(&self.state).buttons.remove(&button);
        self.post(
            EventType::JOYSTICK_BUTTON_UP,
            JoystickEvent {
                button,
                ..self.blank()
            },
        );
    }

    /// A joystick was plugged in or removed; cached state is cleared.
    pub fn configuration_changed(&self) {
        *lock(&self.state) = JoystickState::default();
        self.post(EventType::JOYSTICK_CONFIGURATION, self.blank());
    }

    pub fn state(&self) -> JoystickState {
        lock(&self.state).clone()
    }

    fn blank(&self) -> JoystickEvent {
        JoystickEvent {
            joystick: self.index,
            ..JoystickEvent::default()
        }
    }

    fn post(&self, kind: EventType, event: JoystickEvent) {
        log::trace!("[joystick {}] {kind:?}", self.index);
        self.handle.emit(kind, Payload::Joystick(event));
    }
}

impl EventSource for Joystick {
    fn event_source(&self) -> &EventSourceHandle {
        &self.handle
    }
}
