//! Error types.
//!
//! Constructors that cannot produce a valid value (a timer with zero speed, a
//! user event type with a reserved id, a config file that does not parse)
//! return [`Error`]. Plain queries follow the native convention instead and
//! report through `bool` / `Option`.

use crate::discretizer::DiscretizerId;
use crate::event::EventType;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ---- queue ----
    /// A blocking wait was requested on a queue that has nothing pending and
    /// no registered source that could ever post to it.
    #[error("event queue has no registered sources; waiting would block forever")]
    WaitWouldBlockForever,

    // ---- dispatcher ----
    #[error("no discretizer registered with id {0:?}")]
    UnknownDiscretizer(DiscretizerId),

    // ---- user event types ----
    #[error("event type id {id} is reserved (user ids must lie in {min}..{max})")]
    ReservedEventType { id: u32, min: u32, max: u32 },

    #[error("event type id {id} requested by `{requested}` is already used by `{owner}`")]
    TypeIdConflict {
        id: u32,
        owner: &'static str,
        requested: &'static str,
    },

    #[error("event type mismatch: expected {expected:?}, found {found:?}")]
    EventTypeMismatch {
        expected: EventType,
        found: EventType,
    },

    #[error("event of type {0:?} carries no user payload")]
    NotUserEvent(EventType),

    // ---- timer ----
    #[error("timer speed must be positive and finite")]
    InvalidTimerSpeed,

    // ---- config ----
    #[error("invalid config: {0}")]
    Config(String),

    #[error("config i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    // ---- generic ----
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
}
