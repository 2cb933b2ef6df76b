//! Participants and their recorded answers
//!
//! A participant is a player identity scoped to exactly one session. The
//! display name is screened for inappropriate content at join time but is
//! not required to be unique within the session. Answers are stored raw;
//! correctness is evaluated lazily by the scoring module.

use std::{
    collections::{BTreeSet, HashMap},
    fmt::Display,
    str::FromStr,
};

use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;
use web_time::SystemTime;

use crate::{
    error::{Error, Result},
    quiz::question::QuestionId,
    session_id::SessionId,
};

/// A unique identifier for a participant within a session
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Creates a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    /// Creates a new random participant ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ParticipantId {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ParticipantId {
    type Err = uuid::Error;

    /// Parses an ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A recorded submission for one question
///
/// The window-start timestamp is copied in at submission time so the score
/// can be derived later without consulting session state that has since
/// moved on. Correctness is never stored; it is computed on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The selected option indices
    pub indices: BTreeSet<usize>,
    /// When the answer window for the question opened
    pub window_started_at: SystemTime,
    /// When this submission was received
    pub submitted_at: SystemTime,
}

/// A player identity scoped to exactly one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Identifier handed back to the client at join time
    pub id: ParticipantId,
    /// The session this participant belongs to
    pub session_id: SessionId,
    /// Display name; uniqueness within the session is not required
    pub name: String,
    /// Join sequence number, used as the leaderboard tie-break
    pub joined: u64,
    /// Submitted answers keyed by question id
    pub answers: HashMap<QuestionId, Answer>,
}

impl Participant {
    /// Creates a participant with no recorded answers
    pub fn new(id: ParticipantId, session_id: SessionId, name: String, joined: u64) -> Self {
        Self {
            id,
            session_id,
            name,
            joined,
            answers: HashMap::new(),
        }
    }
}

/// Screens and normalizes a display name supplied at join time
///
/// The name is trimmed, then rejected if empty, too long, or flagged as
/// inappropriate by the content filter.
///
/// # Errors
///
/// Returns [`Error::Validation`] describing the rejected name.
pub fn validate_display_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::Validation("name cannot be empty".to_owned()));
    }
    if name.len() > crate::constants::participant::MAX_NAME_LENGTH {
        return Err(Error::Validation("name is too long".to_owned()));
    }
    if name.is_inappropriate() {
        return Err(Error::Validation("name is inappropriate".to_owned()));
    }

    Ok(name.to_owned())
}
