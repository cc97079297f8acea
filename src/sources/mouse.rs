//! Mouse event source.

use crate::error::{Error, Result};
use crate::event::{EventType, MouseEvent, Payload};
use crate::keycodes::MOUSE_BUTTON_MAX;
use crate::source::{lock, EventSource, EventSourceHandle};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Last known pointer position, wheel positions and held buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseState {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub w: i32,
    /// Bit `n - 1` is set while button `n` is held.
    pub buttons: u32,
    pub in_display: bool,
}

impl MouseState {
    pub fn is_button_down(&self, button: u32) -> bool {
        (1..=MOUSE_BUTTON_MAX).contains(&button) && self.buttons & (1 << (button - 1)) != 0
    }
}

#[derive(Debug)]
pub struct Mouse {
    handle: EventSourceHandle,
    state: Mutex<MouseState>,
}

impl Mouse {
    pub fn new() -> Self {
        Self {
            handle: EventSourceHandle::new("mouse"),
            state: Mutex::new(MouseState::default()),
        }
    }

    /// Moves the pointer to `(x, y)`; the event carries the delta.
    pub fn move_to(&self, x: i32, y: i32) {
        let ev = {
            let mut s = lock(&self.state);
            let ev = MouseEvent {
                dx: x.wrapping_sub(s.x),
                dy: y.wrapping_sub(s.y),
                ..snapshot(&s, x, y)
            };
            s.x = x;
            s.y = y;
            ev
        };
        self.post(EventType::MOUSE_AXES, ev);
    }

    /// Scrolls the vertical (`dz`) and horizontal (`dw`) wheels.
    pub fn scroll(&self, dz: i32, dw: i32) {
        let ev = {
            let mut s = lock(&self.state);
            s.z = s.z.wrapping_add(dz);
            s.w = s.w.wrapping_add(dw);
            MouseEvent {
                dz,
                dw,
                ..snapshot(&s, s.x, s.y)
            }
        };
        self.post(EventType::MOUSE_AXES, ev);
    }

    pub fn button_down(&self, button: u32) -> Result<()> {
        self.button_edge(EventType::MOUSE_BUTTON_DOWN, button, true)
    }

    pub fn button_up(&self, button: u32) -> Result<()> {
        self.button_edge(EventType::MOUSE_BUTTON_UP, button, false)
    }

    pub fn enter_display(&self, x: i32, y: i32) {
        self.reposition(EventType::MOUSE_ENTER_DISPLAY, x, y, Some(true));
    }

    pub fn leave_display(&self, x: i32, y: i32) {
        self.reposition(EventType::MOUSE_LEAVE_DISPLAY, x, y, Some(false));
    }

    /// Pointer moved by the application rather than the user.
    pub fn warp(&self, x: i32, y: i32) {
        self.reposition(EventType::MOUSE_WARPED, x, y, None);
    }

    pub fn state(&self) -> MouseState {
        *lock(&self.state)
    }

    fn button_edge(&self, kind: EventType, button: u32, down: bool) -> Result<()> {
        if !(1..=MOUSE_BUTTON_MAX).contains(&button) {
            return Err(Error::OutOfRange {
                what: "mouse button",
                index: button as usize,
                len: MOUSE_BUTTON_MAX as usize + 1,
            });
        }
        let ev = {
            let mut s = lock(&self.state);
            if down {
                s.buttons |= 1 << (button - 1);
            } else {
                s.buttons &= !(1 << (button - 1));
            }
            MouseEvent {
                button,
                ..snapshot(&s, s.x, s.y)
            }
        };
        self.post(kind, ev);
        Ok(())
    }

    fn reposition(&self, kind: EventType, x: i32, y: i32, inside: Option<bool>) {
        let ev = {
            let mut s = lock(&self.state);
            let ev = MouseEvent {
                dx: x.wrapping_sub(s.x),
                dy: y.wrapping_sub(s.y),
                ..snapshot(&s, x, y)
            };
            s.x = x;
            s.y = y;
            if let Some(inside) = inside {
                s.in_display = inside;
            }
            ev
        };
        self.post(kind, ev);
    }

    fn post(&self, kind: EventType, event: MouseEvent) {
        log::trace!("[mouse] {kind:?} at ({}, {})", event.x, event.y);
        self.handle.emit(kind, Payload::Mouse(event));
    }
}

fn snapshot(s: &MouseState, x: i32, y: i32) -> MouseEvent {
    MouseEvent {
        x,
        y,
        z: s.z,
        w: s.w,
        pressure: if s.buttons != 0 { 1.0 } else { 0.0 },
        ..MouseEvent::default()
    }
}

impl Default for Mouse {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for Mouse {
    fn event_source(&self) -> &EventSourceHandle {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;

    #[test]
    fn motion_reports_deltas() {
        let mouse = Mouse::new();
        let mut q = EventQueue::new();
        q.register_source(&mouse);
        mouse.move_to(10, 20);
        mouse.move_to(15, 18);

        let _ = q.get_next_event();
        let ev = q.get_next_event().unwrap();
        let m = ev.mouse().unwrap();
        assert_eq!((m.x, m.y, m.dx, m.dy), (15, 18, 5, -2));
        assert_eq!(m.button, 0);
    }

    #[test]
    fn wheel_accumulates() {
        let mouse = Mouse::new();
        mouse.scroll(1, 0);
        mouse.scroll(2, -1);
        let s = mouse.state();
        assert_eq!((s.z, s.w), (3, -1));
    }

    #[test]
    fn buttons_are_tracked_and_validated() {
        let mouse = Mouse::new();
        mouse.button_down(1).unwrap();
        mouse.button_down(3).unwrap();
        assert!(mouse.state().is_button_down(1));
        assert!(mouse.state().is_button_down(3));
        mouse.button_up(1).unwrap();
        assert!(!mouse.state().is_button_down(1));
        assert!(mouse.button_down(0).is_err());
        assert!(mouse.button_down(MOUSE_BUTTON_MAX + 1).is_err());
    }

    #[test]
    fn extreme_coordinates_wrap() {
        let mouse = Mouse::new();
        let mut q = EventQueue::new();
        q.register_source(&mouse);
        mouse.move_to(i32::MIN, i32::MAX);
        mouse.move_to(i32::MAX, i32::MIN);
        mouse.scroll(i32::MAX, i32::MIN);
        mouse.scroll(1, -1);

        let _ = q.get_next_event();
        let ev = q.get_next_event().unwrap();
        let m = ev.mouse().unwrap();
        assert_eq!((m.dx, m.dy), (-1, 1));
        let s = mouse.state();
        assert_eq!((s.z, s.w), (i32::MIN, i32::MAX));
    }

    #[test]
    fn state_round_trips_through_json() {
        let mouse = Mouse::new();
        mouse.enter_display(40, 30);
        mouse.button_down(2).unwrap();
        mouse.scroll(-3, 1);

        let json = serde_json::to_string(&mouse.state()).unwrap();
        let back: MouseState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mouse.state());
        assert!(back.is_button_down(2));
    }

    #[test]
    fn enter_and_leave_toggle_in_display() {
        let mouse = Mouse::new();
        mouse.enter_display(1, 1);
        assert!(mouse.state().in_display);
        mouse.leave_display(0, 0);
        assert!(!mouse.state().in_display);
    }
}
