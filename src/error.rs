//! Business error taxonomy for the session core
//!
//! Every recoverable, expected outcome of a core operation is a variant of
//! [`Error`]. The boundary layer translates [`ErrorKind`] into protocol
//! status codes; the core's contract is the kind, not any representation.
//! Only infrastructure faults (an unavailable repository) carry an opaque
//! source and propagate undecorated.

use serde::Serialize;
use thiserror::Error;

use crate::{game::GameId, participant::ParticipantId, session_id::SessionId};

/// The coarse classification of an [`Error`], for boundary-layer mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// An unknown game, session, or participant was referenced
    NotFound,
    /// A non-owner attempted an administrator mutation
    Forbidden,
    /// The operation clashes with existing state (double start, late join)
    Conflict,
    /// The operation is not valid for the session's current state
    InvalidState,
    /// A submission arrived after the answer window closed
    WindowClosed,
    /// A malformed payload (answer indices, question definition, name)
    Validation,
    /// An infrastructure fault in the external repository
    Repository,
}

/// Errors returned by the session core
#[derive(Debug, Error)]
pub enum Error {
    /// No game exists with the given id
    #[error("game {0} not found")]
    GameNotFound(GameId),
    /// No session exists with the given id
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    /// The game has never run a session, so there is nothing to mutate
    #[error("game {0} has no session")]
    GameHasNoSession(GameId),
    /// No participant exists with the given id
    #[error("participant {0} not found")]
    ParticipantNotFound(ParticipantId),
    /// The requester is not the owner of the game
    #[error("requester is not the game owner")]
    Forbidden,
    /// The game already has an active session
    #[error("game already has an active session")]
    SessionAlreadyActive,
    /// The session has left the lobby and no longer accepts participants
    #[error("session is no longer accepting participants")]
    JoinClosed,
    /// The session has reached the maximum number of participants
    #[error("maximum number of participants reached")]
    SessionFull,
    /// The operation is not valid for the session's current state
    #[error("{0}")]
    InvalidState(&'static str),
    /// The answer window for the current question has closed
    #[error("answer window has closed")]
    WindowClosed,
    /// A malformed payload was supplied
    #[error("{0}")]
    Validation(String),
    /// The external game repository failed
    #[error("repository unavailable: {0}")]
    Repository(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Returns the taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GameNotFound(_)
            | Self::SessionNotFound(_)
            | Self::GameHasNoSession(_)
            | Self::ParticipantNotFound(_) => ErrorKind::NotFound,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::SessionAlreadyActive | Self::JoinClosed | Self::SessionFull => {
                ErrorKind::Conflict
            }
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::WindowClosed => ErrorKind::WindowClosed,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Repository(_) => ErrorKind::Repository,
        }
    }
}

impl From<garde::Report> for Error {
    /// Collapses an authoring-time validation report into a single message
    fn from(report: garde::Report) -> Self {
        Self::Validation(report.to_string())
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
