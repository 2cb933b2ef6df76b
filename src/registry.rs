//! Ownership and lookup of live and archived sessions
//!
//! The registry is the single point of truth for session existence. Each
//! session sits behind its own mutex — the critical section required by
//! the concurrency model — while the registry's maps are only locked for
//! insert, lookup, and archive, so unrelated sessions never contend. The
//! registry enforces no business rules; those live in the session itself.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use crate::{
    error::{Error, Result},
    game::Game,
    participant::ParticipantId,
    session::Session,
    session_id::SessionId,
};

/// Locks a session, recovering from a poisoned mutex
///
/// Session state is consistent after every operation, so a panic while
/// holding the lock cannot leave it half-written.
pub fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns all live and archived sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Sessions that are currently running
    live: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
    /// Sessions that have ended; kept for their results
    archived: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
    /// Which session each participant belongs to
    participants: RwLock<HashMap<ParticipantId, SessionId>>,
}

impl SessionRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a live session for a game and returns its join code
    ///
    /// Join codes are drawn until one is free among both live and archived
    /// sessions.
    pub fn create(&self, game: &Game) -> (SessionId, Arc<Mutex<Session>>) {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let archived = self
            .archived
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let id = loop {
            let candidate = SessionId::new();
            if !live.contains_key(&candidate) && !archived.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = Arc::new(Mutex::new(Session::new(id, game)));
        live.insert(id, Arc::clone(&session));
        (id, session)
    }

    /// Looks up a session by id, live or archived
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] for an unknown id.
    pub fn get(&self, id: SessionId) -> Result<Arc<Mutex<Session>>> {
        if let Some(session) = self
            .live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Arc::clone(session));
        }
        self.archived
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(Arc::clone)
            .ok_or(Error::SessionNotFound(id))
    }

    /// Moves an ended session from the live map to the archive
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the id is not live.
    pub fn archive(&self, id: SessionId) -> Result<()> {
        let session = self
            .live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(Error::SessionNotFound(id))?;
        self.archived
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session);
        Ok(())
    }

    /// Removes a live session that never got off the ground
    ///
    /// Used to roll back `create` when persisting the game's
    /// active-session pointer fails.
    pub fn discard(&self, id: SessionId) {
        self.live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Records which session a participant belongs to
    pub fn register_participant(&self, participant: ParticipantId, session: SessionId) {
        self.participants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(participant, session);
    }

    /// Resolves a participant to their session
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParticipantNotFound`] for an unknown participant.
    pub fn session_of(&self, participant: ParticipantId) -> Result<SessionId> {
        self.participants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&participant)
            .copied()
            .ok_or(Error::ParticipantNotFound(participant))
    }
}
