//! Built-in event sources.
//!
//! Implementations of [`EventSource`](crate::source::EventSource) for the input
//! devices, displays, timers and application-defined events. Input sources are
//! fed by the host: a platform layer (or a test) calls `key_down`, `move_to`,
//! `close_requested`, ... and the source posts the matching event.

pub mod display;
pub mod joystick;
pub mod keyboard;
pub mod mouse;
pub mod timer;
pub mod user;

pub use display::Display;
pub use joystick::{AxisReading, Joystick, JoystickState};
pub use keyboard::{Keyboard, KeyboardState};
pub use mouse::{Mouse, MouseState};
pub use timer::Timer;
pub use user::UserEventSource;
