//! Event records and their type tags.
//!
//! An [`Event`] is a small tagged record: an [`EventType`] tag, the id of the
//! source that posted it, a timestamp, and a payload whose shape depends on the
//! tag. Payloads are plain data ([`KeyboardEvent`], [`MouseEvent`], ...) except
//! for user events, whose storage is described in [`crate::user_event`].
//!
//! ## Type tag conventions
//! - Built-in tags use the native numbering (joystick `1..=4`, keyboard
//!   `10..=12`, mouse `20..=25`, timer `30`, display `40..=47`).
//! - Tags `>= USER_EVENT_MIN` belong to user event types.
//!
//! ## Timestamps
//! `timestamp` is in seconds since the first event-related call of the process
//! (see [`event_time`]). It is monotonic and only meaningful within a run.

use crate::source::SourceId;
use crate::user_event::UserPayload;
use std::sync::OnceLock;
use std::time::Instant;

/// Type tag of an [`Event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(pub u32);

impl EventType {
    pub const JOYSTICK_AXIS: EventType = EventType(1);
    pub const JOYSTICK_BUTTON_DOWN: EventType = EventType(2);
    pub const JOYSTICK_BUTTON_UP: EventType = EventType(3);
    pub const JOYSTICK_CONFIGURATION: EventType = EventType(4);

    pub const KEY_DOWN: EventType = EventType(10);
    pub const KEY_CHAR: EventType = EventType(11);
    pub const KEY_UP: EventType = EventType(12);

    pub const MOUSE_AXES: EventType = EventType(20);
    pub const MOUSE_BUTTON_DOWN: EventType = EventType(21);
    pub const MOUSE_BUTTON_UP: EventType = EventType(22);
    pub const MOUSE_ENTER_DISPLAY: EventType = EventType(23);
    pub const MOUSE_LEAVE_DISPLAY: EventType = EventType(24);
    pub const MOUSE_WARPED: EventType = EventType(25);

    pub const TIMER: EventType = EventType(30);

    pub const DISPLAY_EXPOSE: EventType = EventType(40);
    pub const DISPLAY_RESIZE: EventType = EventType(41);
    pub const DISPLAY_CLOSE: EventType = EventType(42);
    pub const DISPLAY_LOST: EventType = EventType(43);
    pub const DISPLAY_FOUND: EventType = EventType(44);
    pub const DISPLAY_SWITCH_IN: EventType = EventType(45);
    pub const DISPLAY_SWITCH_OUT: EventType = EventType(46);
    pub const DISPLAY_ORIENTATION: EventType = EventType(47);

    /// Raw tag value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// `true` for tags owned by user event types.
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 >= crate::user_event::USER_EVENT_MIN
    }

    pub const fn is_keyboard(self) -> bool {
        self.0 >= 10 && self.0 <= 12
    }

    pub const fn is_mouse(self) -> bool {
        self.0 >= 20 && self.0 <= 25
    }

    pub const fn is_joystick(self) -> bool {
        self.0 >= 1 && self.0 <= 4
    }

    pub const fn is_display(self) -> bool {
        self.0 >= 40 && self.0 <= 47
    }

    /// Human-readable name of a built-in tag.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::JOYSTICK_AXIS => "joystick-axis",
            Self::JOYSTICK_BUTTON_DOWN => "joystick-button-down",
            Self::JOYSTICK_BUTTON_UP => "joystick-button-up",
            Self::JOYSTICK_CONFIGURATION => "joystick-configuration",
            Self::KEY_DOWN => "key-down",
            Self::KEY_CHAR => "key-char",
            Self::KEY_UP => "key-up",
            Self::MOUSE_AXES => "mouse-axes",
            Self::MOUSE_BUTTON_DOWN => "mouse-button-down",
            Self::MOUSE_BUTTON_UP => "mouse-button-up",
            Self::MOUSE_ENTER_DISPLAY => "mouse-enter-display",
            Self::MOUSE_LEAVE_DISPLAY => "mouse-leave-display",
            Self::MOUSE_WARPED => "mouse-warped",
            Self::TIMER => "timer",
            Self::DISPLAY_EXPOSE => "display-expose",
            Self::DISPLAY_RESIZE => "display-resize",
            Self::DISPLAY_CLOSE => "display-close",
            Self::DISPLAY_LOST => "display-lost",
            Self::DISPLAY_FOUND => "display-found",
            Self::DISPLAY_SWITCH_IN => "display-switch-in",
            Self::DISPLAY_SWITCH_OUT => "display-switch-out",
            Self::DISPLAY_ORIENTATION => "display-orientation",
            _ => return None,
        })
    }
}

/// Key press, release or character input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// Layout-independent key code (see [`crate::keycodes`]).
    pub keycode: u32,
    /// Translated character. Only set for `KEY_CHAR`.
    pub unichar: Option<char>,
    /// Modifier bit set (`MOD_*` in [`crate::keycodes`]).
    pub modifiers: u32,
    /// `KEY_CHAR` produced by auto-repeat.
    pub repeat: bool,
}

/// Mouse motion, wheel, button or display enter/leave.
///
/// `z` is the vertical wheel, `w` the horizontal one. Buttons are 1-based;
/// `button` is `0` for pure motion events.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MouseEvent {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub w: i32,
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
    pub dw: i32,
    pub button: u32,
    pub pressure: f32,
}

/// Display state change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayEvent {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub orientation: i32,
}

/// Periodic timer tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimerEvent {
    /// Timer count after this tick.
    pub count: i64,
    /// How late the tick was delivered, in seconds.
    pub error: f64,
}

/// Joystick axis, button or configuration change.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JoystickEvent {
    /// Index of the joystick that produced the event.
    pub joystick: u32,
    pub stick: i32,
    pub axis: i32,
    /// Axis position, normalized to `[-1.0, 1.0]`.
    pub pos: f32,
    pub button: i32,
}

/// Type-specific part of an [`Event`].
#[derive(Clone, Debug)]
pub enum Payload {
    None,
    Keyboard(KeyboardEvent),
    Mouse(MouseEvent),
    Display(DisplayEvent),
    Timer(TimerEvent),
    Joystick(JoystickEvent),
    User(UserPayload),
}

/// A single event record.
#[derive(Clone, Debug)]
pub struct Event {
    kind: EventType,
    source: SourceId,
    timestamp: f64,
    payload: Payload,
}

impl Event {
    /// Builds an event not attributed to any source, stamped with the current time.
    pub fn new(kind: EventType, payload: Payload) -> Self {
        Self {
            kind,
            source: SourceId::NONE,
            timestamp: event_time(),
            payload,
        }
    }

    pub(crate) fn with_source(mut self, source: SourceId) -> Self {
        self.source = source;
        self
    }

    #[inline]
    pub fn kind(&self) -> EventType {
        self.kind
    }

    /// Id of the source that posted this event ([`SourceId::NONE`] if built directly).
    #[inline]
    pub fn source(&self) -> SourceId {
        self.source
    }

    #[inline]
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub(crate) fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn keyboard(&self) -> Option<&KeyboardEvent> {
        match &self.payload {
            Payload::Keyboard(k) => Some(k),
            _ => None,
        }
    }

    pub fn mouse(&self) -> Option<&MouseEvent> {
        match &self.payload {
            Payload::Mouse(m) => Some(m),
            _ => None,
        }
    }

    pub fn display(&self) -> Option<&DisplayEvent> {
        match &self.payload {
            Payload::Display(d) => Some(d),
            _ => None,
        }
    }

    pub fn timer(&self) -> Option<&TimerEvent> {
        match &self.payload {
            Payload::Timer(t) => Some(t),
            _ => None,
        }
    }

    pub fn joystick(&self) -> Option<&JoystickEvent> {
        match &self.payload {
            Payload::Joystick(j) => Some(j),
            _ => None,
        }
    }
}

/// Seconds elapsed since the process event epoch.
pub fn event_time() -> f64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}
