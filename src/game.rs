//! Game definitions and the repository seam
//!
//! A [`Game`] is authored and persisted by the external CRUD layer; the
//! core only reads its question list and writes the active-session pointer
//! and the archived-session history through [`GameRepository`]. An
//! in-memory repository is provided for tests and simple embeddings.

use std::{
    collections::HashMap,
    fmt::Display,
    str::FromStr,
    sync::{PoisonError, RwLock},
};

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    quiz::question::Question,
    session_id::SessionId,
};

/// A unique identifier for a game definition
///
/// Issued by the authoring layer when a game is created.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct GameId(Uuid);

impl GameId {
    /// Creates a new random game ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    /// Creates a new random game ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for GameId {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GameId {
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

/// A game definition: an ordered list of questions plus session bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Game {
    /// Identifier issued by the authoring layer
    #[garde(skip)]
    pub id: GameId,
    /// Opaque owner identity from the external auth layer
    #[garde(skip)]
    pub owner: String,
    /// Display name of the game
    #[garde(length(max = crate::constants::game::MAX_NAME_LENGTH))]
    pub name: String,
    /// The ordered questions played during a session
    #[garde(length(min = 1, max = crate::constants::game::MAX_QUESTION_COUNT), dive)]
    pub questions: Vec<Question>,
    /// The currently running session, if any
    #[garde(skip)]
    pub active_session: Option<SessionId>,
    /// Ids of sessions that have been run and archived, oldest first
    #[garde(skip)]
    pub past_sessions: Vec<SessionId>,
}

impl Game {
    /// Creates a new game definition with no session history
    pub fn new(owner: impl Into<String>, name: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id: GameId::new(),
            owner: owner.into(),
            name: name.into(),
            questions,
            active_session: None,
            past_sessions: Vec::new(),
        }
    }

    /// Validates the whole definition, bounds and cross-field rules alike
    ///
    /// Run once when a session is started (and by the authoring layer when
    /// the definition is saved); never re-run on the polling path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first violated rule.
    pub fn check_definition(&self) -> Result<()> {
        self.validate()?;
        for question in &self.questions {
            question.check_consistency()?;
        }
        Ok(())
    }

    /// Returns the number of questions in this game
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks whether this game contains any questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// The persistence seam between the core and the external CRUD layer
///
/// The core calls `get` to load a definition and `save` to persist the
/// active-session pointer and archived-session history. Implementations
/// map their own infrastructure failures to [`Error::Repository`].
pub trait GameRepository {
    /// Loads a game definition by id
    ///
    /// # Errors
    ///
    /// Returns [`Error::GameNotFound`] for an unknown id, or
    /// [`Error::Repository`] for an infrastructure fault.
    fn get(&self, id: GameId) -> Result<Game>;

    /// Persists a game definition, overwriting any previous version
    ///
    /// # Errors
    ///
    /// Returns [`Error::Repository`] for an infrastructure fault.
    fn save(&self, game: &Game) -> Result<()>;
}

/// A thread-safe in-memory [`GameRepository`] for tests and embeddings
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    games: RwLock<HashMap<GameId, Game>>,
}

impl InMemoryGameRepository {
    /// Creates an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a game, returning its id for convenience
    pub fn insert(&self, game: Game) -> GameId {
        let id = game.id;
        self.games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, game);
        id
    }
}

impl GameRepository for InMemoryGameRepository {
    fn get(&self, id: GameId) -> Result<Game> {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(Error::GameNotFound(id))
    }

    fn save(&self, game: &Game) -> Result<()> {
        self.games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(game.id, game.clone());
        Ok(())
    }
}
