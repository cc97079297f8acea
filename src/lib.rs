//! mmevents: event queues, discretized dispatch and a frame-limited run loop.
//!
//! Sources ([`Keyboard`], [`Mouse`], [`Display`], [`Joystick`], [`Timer`],
//! [`UserEventSource`]) post [`Event`]s into any number of [`EventQueue`]s. An
//! [`EventDispatcher`] routes each event to one handler, by discretized value
//! (e.g. key code), by type, or to a catch-all. [`EventLoop`] ties a queue and a
//! dispatcher to a paced tick loop.
//!
//! ```no_run
//! use mmevents::{keycodes, Display, EventLoop, EventType, HandlerCoordinate, Keyboard};
//!
//! let display = Display::new(640, 480);
//! let keyboard = Keyboard::new();
//!
//! let mut el = EventLoop::new();
//! el.attach_display(&display);
//! el.register_source(&keyboard);
//! el.exit_on(HandlerCoordinate::of_type(EventType::DISPLAY_CLOSE)).unwrap();
//! el.exit_on(HandlerCoordinate::of_value(
//!     EventType::KEY_DOWN,
//!     mmevents::DiscretizerId::KEYCODE,
//!     keycodes::KEY_ESCAPE.into(),
//! ))
//! .unwrap();
//!
//! el.run(|frame| {
//!     // draw
//!     let _ = frame.fps();
//! })
//! .unwrap();
//! ```

pub mod config;
pub mod discretizer;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod event_loop;
pub mod handler;
pub mod keycodes;
pub mod queue;
pub mod source;
pub mod sources;
pub mod user_event;

pub use config::LoopConfig;
pub use discretizer::{Discretizer, DiscretizerId};
pub use dispatcher::{DispatchResult, EventDispatcher, HandlerCoordinate};
pub use error::{Error, Result};
pub use event::*;
pub use event_loop::{EventLoop, ExitHandle, FpsCounter, Frame, FrameLimit, LoopStats};
pub use handler::{DispatchInfo, EventHandler, EventPayload, GenericEventHandler, IntoEventHandler};
pub use queue::EventQueue;
pub use source::{EventSource, EventSourceHandle, SourceId};
pub use sources::*;
pub use user_event::{can_store_inline, user_event_type, PayloadStorage, UserEventType, UserPayload};
