//! Display event source.
//!
//! [`Display`] stands for one window or screen. The host reports what happened
//! to it (close button, resize, focus switches, device loss) and the display
//! posts the matching event. It also carries the refresh rate the event loop
//! uses for [`FrameLimit::Auto`](crate::event_loop::FrameLimit::Auto).

use crate::event::{DisplayEvent, EventType, Payload};
use crate::source::{lock, EventSource, EventSourceHandle};
use std::sync::Mutex;

/// Refresh rate assumed when none is configured.
pub const DEFAULT_REFRESH_RATE: f64 = 60.0;

#[derive(Clone, Copy, Debug)]
struct Geometry {
    width: i32,
    height: i32,
    orientation: i32,
}

#[derive(Debug)]
pub struct Display {
    handle: EventSourceHandle,
    geometry: Mutex<Geometry>,
    refresh_rate: f64,
}

impl Display {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            handle: EventSourceHandle::new("display"),
            geometry: Mutex::new(Geometry {
                width,
                height,
                orientation: 0,
            }),
            refresh_rate: DEFAULT_REFRESH_RATE,
        }
    }

    /// Sets the refresh rate. Non-positive or non-finite values keep the default.
    pub fn with_refresh_rate(mut self, hz: f64) -> Self {
        if hz.is_finite() && hz > 0.0 {
            self.refresh_rate = hz;
        } else {
            log::warn!("Ignoring invalid refresh rate {hz}");
        }
        self
    }

    pub fn refresh_rate(&self) -> f64 {
        self.refresh_rate
    }

    pub fn size(&self) -> (i32, i32) {
        let g = lock(&self.geometry);
        (g.width, g.height)
    }

    /// The user asked to close the display.
    pub fn close_requested(&self) {
        self.post(EventType::DISPLAY_CLOSE, DisplayEvent::default());
    }

    pub fn resized(&self, width: i32, height: i32) {
        {
            let mut g = lock(&self.geometry);
            g.width = width;
            g.height = height;
        }
        self.post(
            EventType::DISPLAY_RESIZE,
            DisplayEvent {
                width,
                height,
                ..self.current()
            },
        );
    }

    /// Part of the display needs redrawing.
    pub fn expose(&self, x: i32, y: i32, width: i32, height: i32) {
        self.post(
            EventType::DISPLAY_EXPOSE,
            DisplayEvent {
                x,
                y,
                width,
                height,
                orientation: lock(&self.geometry).orientation,
            },
        );
    }

    pub fn switch_in(&self) {
        self.post(EventType::DISPLAY_SWITCH_IN, self.current());
    }

    pub fn switch_out(&self) {
        self.post(EventType::DISPLAY_SWITCH_OUT, self.current());
    }

    /// Rendering resources were lost (e.g. device reset).
    pub fn lost(&self) {
        self.post(EventType::DISPLAY_LOST, self.current());
    }

    pub fn found(&self) {
        self.post(EventType::DISPLAY_FOUND, self.current());
    }

    pub fn orientation(&self, orientation: i32) {
        lock(&self.geometry).orientation = orientation;
        self.post(EventType::DISPLAY_ORIENTATION, self.current());
    }

    fn current(&self) -> DisplayEvent {
        let g = *lock(&self.geometry);
        DisplayEvent {
            x: 0,
            y: 0,
            width: g.width,
            height: g.height,
            orientation: g.orientation,
        }
    }

    fn post(&self, kind: EventType, event: DisplayEvent) {
        log::trace!("[display] {kind:?}");
        self.handle.emit(kind, Payload::Display(event));
    }
}

impl EventSource for Display {
    fn event_source(&self) -> &EventSourceHandle {
        &self.handle
    }
}
