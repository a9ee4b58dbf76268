//! Error types for the pace_core library.

use crate::{EventId, UserId};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Why an undo request was refused
#[derive(Debug, Clone, PartialEq)]
pub enum UndoRefusal {
    /// No user record for the identity
    UserMissing,
    /// The user has no events to undo
    NoEvent,
    /// The newest event is older than the undo window
    WindowExpired { elapsed_seconds: i64 },
    /// The newest event was never assigned an id by the store
    MissingEventId,
}

impl std::fmt::Display for UndoRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UndoRefusal::UserMissing => write!(f, "user not found"),
            UndoRefusal::NoEvent => write!(f, "no event to undo"),
            UndoRefusal::WindowExpired { elapsed_seconds } => write!(
                f,
                "too late to undo ({} minutes since the event)",
                elapsed_seconds / 60
            ),
            UndoRefusal::MissingEventId => write!(f, "event has no stored identity"),
        }
    }
}

/// Core error type for pace_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation needs a user record that does not exist
    #[error("User {0} is not initialized")]
    NotInitialized(UserId),

    /// Undo preconditions were not met; nothing was changed
    #[error("Cannot undo: {0}")]
    CannotUndo(UndoRefusal),

    /// The user was restored but the event could not be removed from the log
    #[error("Undo incomplete: user restored but event {event_id} was not deleted: {source}")]
    UndoIncomplete {
        event_id: EventId,
        #[source]
        source: Box<Error>,
    },

    /// Save was called for an identity the store does not know
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    /// Delete was called for an event id the store does not know
    #[error("Unknown event: {0}")]
    UnknownEvent(EventId),

    /// Create was called for an identity that already exists
    #[error("User {0} already exists")]
    AlreadyExists(UserId),

    /// Caller supplied values outside the valid domain
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// State management error
    #[error("State error: {0}")]
    State(String),
}

impl Error {
    /// True for failures of the storage layer itself (as opposed to domain refusals).
    ///
    /// Idempotent reads that fail this way may be retried by the caller. Writes
    /// such as event registration are never safe to retry blindly.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Json(_) | Error::Csv(_) | Error::State(_)
        )
    }
}
