//! The core-exposed operations
//!
//! [`Engine`] ties the registry, the state machine, and the views together
//! behind the transport-agnostic contract: `start`, `mutate`, `join`,
//! `submit_answer`, `status`, and `results`. A boundary layer maps these
//! onto whatever protocol it likes; every call here is synchronous and
//! returns immediately, and the engine's clock is the only one consulted.

use std::collections::BTreeSet;

use web_time::SystemTime;

use crate::{
    error::{Error, Result},
    game::{GameId, GameRepository},
    participant::ParticipantId,
    registry::{self, SessionRegistry},
    session_id::SessionId,
    view::{ResultsView, StatusView},
};

/// An administrator command against a game's current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum SessionCommand {
    /// Move to the next question, or past the last one into results
    Advance,
    /// End the session and archive it
    End,
}

/// The live quiz engine: session lifecycle, submissions, and polling
///
/// Generic over the [`GameRepository`] seam so the external CRUD layer can
/// plug in whatever persistence it uses.
#[derive(Debug)]
pub struct Engine<R> {
    repository: R,
    registry: SessionRegistry,
}

impl<R: GameRepository> Engine<R> {
    /// Creates an engine with no live sessions
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            registry: SessionRegistry::new(),
        }
    }

    /// The registry owning this engine's sessions
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Starts a session for a game, leaving it in the lobby
    ///
    /// The game definition is validated here, once; the session snapshots
    /// the question list so concurrent edits cannot affect the run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if the requester does not own the
    /// game, [`Error::SessionAlreadyActive`] if one is already running,
    /// [`Error::Validation`] for a malformed definition, or a repository
    /// error.
    pub fn start(&self, game_id: GameId, requester: &str) -> Result<SessionId> {
        let mut game = self.repository.get(game_id)?;

        if game.owner != requester {
            return Err(Error::Forbidden);
        }
        if game.active_session.is_some() {
            return Err(Error::SessionAlreadyActive);
        }
        game.check_definition()?;

        let (session_id, _) = self.registry.create(&game);
        game.active_session = Some(session_id);

        if let Err(error) = self.repository.save(&game) {
            self.registry.discard(session_id);
            return Err(error);
        }

        tracing::info!(game = %game_id, session = %session_id, "session started");
        Ok(session_id)
    }

    /// Applies an administrator command to a game's current session
    ///
    /// When the game has no active session the most recently archived one
    /// is targeted instead, so a stale client ending twice sees the
    /// state error it deserves rather than a spurious not-found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] for a non-owner,
    /// [`Error::GameHasNoSession`] when no session was ever started, or
    /// whatever the state machine rejects.
    pub fn mutate(&self, game_id: GameId, requester: &str, command: SessionCommand) -> Result<()> {
        let mut game = self.repository.get(game_id)?;

        if game.owner != requester {
            return Err(Error::Forbidden);
        }

        let session_id = game
            .active_session
            .or_else(|| game.past_sessions.last().copied())
            .ok_or(Error::GameHasNoSession(game_id))?;
        let session = self.registry.get(session_id)?;
        let mut session = registry::lock(&session);

        match command {
            SessionCommand::Advance => {
                session.advance(SystemTime::now())?;
                tracing::debug!(
                    session = %session_id,
                    position = session.position(),
                    "session advanced"
                );
            }
            SessionCommand::End => {
                if !session.is_active() {
                    return Err(Error::InvalidState("session has already ended"));
                }

                // Persist the pointer change before flipping the session
                // state, so a failed save leaves the session running and
                // `End` retryable.
                game.active_session = None;
                game.past_sessions.push(session_id);
                self.repository.save(&game)?;

                session.end()?;
                drop(session);
                self.registry.archive(session_id)?;
                tracing::info!(game = %game_id, session = %session_id, "session ended");
            }
        }

        Ok(())
    }

    /// Adds a participant to a session that is still in its lobby
    ///
    /// # Errors
    ///
    /// Returns [`Error::JoinClosed`] once the session has left the lobby,
    /// or [`Error::Validation`] for a rejected display name.
    pub fn join(&self, session_id: SessionId, display_name: &str) -> Result<ParticipantId> {
        let session = self.registry.get(session_id)?;
        let participant_id = registry::lock(&session).join(display_name)?;
        self.registry.register_participant(participant_id, session_id);

        tracing::debug!(session = %session_id, participant = %participant_id, "participant joined");
        Ok(participant_id)
    }

    /// Records a participant's answer to their session's current question
    ///
    /// Validated against the session state read under the same lock, so a
    /// submission can never race a concurrent advance.
    ///
    /// # Errors
    ///
    /// See [`crate::session::Session::submit_answer`].
    pub fn submit_answer(
        &self,
        participant_id: ParticipantId,
        indices: BTreeSet<usize>,
    ) -> Result<()> {
        let session_id = self.registry.session_of(participant_id)?;
        let session = self.registry.get(session_id)?;
        let mut session = registry::lock(&session);
        session.submit_answer(participant_id, indices, SystemTime::now())
    }

    /// Returns the role-specific status snapshot for a session
    ///
    /// Idempotent; lost or duplicate polls are harmless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] for an unknown id, or
    /// [`Error::InvalidState`] once the session has ended.
    pub fn status(&self, session_id: SessionId, identity: Option<&str>) -> Result<StatusView> {
        let session = self.registry.get(session_id)?;
        let session = registry::lock(&session);
        StatusView::of(&session, SystemTime::now(), identity)
    }

    /// Returns the final results of an ended session
    ///
    /// Takes no requester identity: once the session has ended, the
    /// leaderboard and per-question aggregates are served to admin and
    /// participants alike, so there is no role check to make.
    ///
    /// Computed once and cached; repeated calls return identical data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while the session is still running.
    pub fn results(&self, session_id: SessionId) -> Result<ResultsView> {
        let session = self.registry.get(session_id)?;
        let session = registry::lock(&session);
        session.results()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;

    use crate::{
        error::ErrorKind,
        game::{Game, InMemoryGameRepository},
        quiz::question::{Question, QuestionId, QuestionType},
        view::{ParticipantStatus, StatusView},
    };

    use super::*;

    fn question(correct: &[usize]) -> Question {
        Question {
            id: QuestionId::new(),
            text: "Pick".to_owned(),
            kind: if correct.len() > 1 {
                QuestionType::MultipleChoice
            } else {
                QuestionType::SingleChoice
            },
            options: vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
            correct: correct.iter().copied().collect(),
            duration: Duration::from_secs(30),
            points: 100,
            media: None,
        }
    }

    fn engine_with_game(questions: Vec<Question>) -> (Engine<InMemoryGameRepository>, GameId) {
        let repository = InMemoryGameRepository::new();
        let game_id = repository.insert(Game::new("alice", "Quiz", questions));
        (Engine::new(repository), game_id)
    }

    /// A repository that can be told to fail its next save
    struct FlakyRepository {
        inner: InMemoryGameRepository,
        fail_next_save: AtomicBool,
    }

    impl FlakyRepository {
        fn new() -> Self {
            Self {
                inner: InMemoryGameRepository::new(),
                fail_next_save: AtomicBool::new(false),
            }
        }
    }

    impl GameRepository for FlakyRepository {
        fn get(&self, id: GameId) -> Result<Game> {
            self.inner.get(id)
        }

        fn save(&self, game: &Game) -> Result<()> {
            if self.fail_next_save.swap(false, Ordering::SeqCst) {
                return Err(Error::Repository(Box::new(std::io::Error::other(
                    "save failed",
                ))));
            }
            self.inner.save(game)
        }
    }

    #[test]
    fn test_start_requires_ownership() {
        let (engine, game_id) = engine_with_game(vec![question(&[1])]);
        assert_matches!(engine.start(game_id, "mallory"), Err(Error::Forbidden));
    }

    #[test]
    fn test_start_unknown_game() {
        let (engine, _) = engine_with_game(vec![question(&[1])]);
        let error = engine.start(GameId::new(), "alice").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_start_conflicts_with_active_session() {
        let (engine, game_id) = engine_with_game(vec![question(&[1])]);
        engine.start(game_id, "alice").unwrap();

        assert_matches!(
            engine.start(game_id, "alice"),
            Err(Error::SessionAlreadyActive)
        );
    }

    #[test]
    fn test_start_rejects_invalid_definition() {
        let mut bad = question(&[1]);
        bad.correct = BTreeSet::from([7]);
        let (engine, game_id) = engine_with_game(vec![bad]);
        assert_matches!(engine.start(game_id, "alice"), Err(Error::Validation(_)));
    }

    #[test]
    fn test_mutate_requires_ownership_and_a_session() {
        let (engine, game_id) = engine_with_game(vec![question(&[1])]);

        assert_matches!(
            engine.mutate(game_id, "alice", SessionCommand::Advance),
            Err(Error::GameHasNoSession(_))
        );

        engine.start(game_id, "alice").unwrap();
        assert_matches!(
            engine.mutate(game_id, "mallory", SessionCommand::Advance),
            Err(Error::Forbidden)
        );
    }

    #[test]
    fn test_full_run_through_results() {
        let (engine, game_id) = engine_with_game(vec![question(&[1]), question(&[0, 2])]);
        let session_id = engine.start(game_id, "alice").unwrap();

        let dana = engine.join(session_id, "Dana").unwrap();
        let kim = engine.join(session_id, "Kim").unwrap();

        // Question 0
        engine
            .mutate(game_id, "alice", SessionCommand::Advance)
            .unwrap();
        engine.submit_answer(dana, BTreeSet::from([1])).unwrap();
        engine.submit_answer(kim, BTreeSet::from([0])).unwrap();

        // Question 1
        engine
            .mutate(game_id, "alice", SessionCommand::Advance)
            .unwrap();
        engine.submit_answer(dana, BTreeSet::from([0, 2])).unwrap();

        // Into results, then end
        engine
            .mutate(game_id, "alice", SessionCommand::Advance)
            .unwrap();
        assert_matches!(
            engine.results(session_id),
            Err(Error::InvalidState(_))
        );
        engine
            .mutate(game_id, "alice", SessionCommand::End)
            .unwrap();

        let results = engine.results(session_id).unwrap();
        assert_eq!(results.participant_count, 2);
        assert_eq!(results.leaderboard[0].name, "Dana");
        assert!(results.leaderboard[0].total > results.leaderboard[1].total);
        assert_eq!(results.leaderboard[1].total, 0.0);
        assert_eq!(results.questions.len(), 2);

        // Idempotent read
        let again = engine.results(session_id).unwrap();
        assert_eq!(results.leaderboard[0].total, again.leaderboard[0].total);

        // The game's history now records the archived session
        let game = engine.repository.get(game_id).unwrap();
        assert_eq!(game.active_session, None);
        assert_eq!(game.past_sessions, vec![session_id]);
    }

    #[test]
    fn test_end_save_failure_leaves_session_running_and_retryable() {
        let repository = FlakyRepository::new();
        let game_id = repository
            .inner
            .insert(Game::new("alice", "Quiz", vec![question(&[1])]));
        let engine = Engine::new(repository);
        let session_id = engine.start(game_id, "alice").unwrap();

        engine
            .repository
            .fail_next_save
            .store(true, Ordering::SeqCst);
        let error = engine
            .mutate(game_id, "alice", SessionCommand::End)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Repository);

        // Nothing was committed: the session is still running and the
        // game still points at it
        assert_matches!(
            engine.status(session_id, Some("alice")).unwrap(),
            StatusView::Admin(_)
        );
        let game = engine.repository.inner.get(game_id).unwrap();
        assert_eq!(game.active_session, Some(session_id));
        assert!(game.past_sessions.is_empty());

        // The retry goes through and archives the session
        engine.mutate(game_id, "alice", SessionCommand::End).unwrap();
        assert!(engine.results(session_id).is_ok());
        let game = engine.repository.inner.get(game_id).unwrap();
        assert_eq!(game.active_session, None);
        assert_eq!(game.past_sessions, vec![session_id]);
    }

    #[test]
    fn test_start_save_failure_discards_the_session() {
        let repository = FlakyRepository::new();
        let game_id = repository
            .inner
            .insert(Game::new("alice", "Quiz", vec![question(&[1])]));
        let engine = Engine::new(repository);

        engine
            .repository
            .fail_next_save
            .store(true, Ordering::SeqCst);
        assert_matches!(engine.start(game_id, "alice"), Err(Error::Repository(_)));

        // The failed start left no trace; a retry works
        let game = engine.repository.inner.get(game_id).unwrap();
        assert_eq!(game.active_session, None);
        engine.start(game_id, "alice").unwrap();
    }

    #[test]
    fn test_end_twice_is_invalid_state_not_not_found() {
        let (engine, game_id) = engine_with_game(vec![question(&[1])]);
        let session_id = engine.start(game_id, "alice").unwrap();
        engine.mutate(game_id, "alice", SessionCommand::End).unwrap();

        assert_matches!(
            engine.mutate(game_id, "alice", SessionCommand::End),
            Err(Error::InvalidState(_))
        );
        // And the session is gone from the game's active pointer but still
        // resolvable for results
        assert!(engine.results(session_id).is_ok());
    }

    #[test]
    fn test_join_after_lobby_conflicts() {
        let (engine, game_id) = engine_with_game(vec![question(&[1])]);
        let session_id = engine.start(game_id, "alice").unwrap();
        engine
            .mutate(game_id, "alice", SessionCommand::Advance)
            .unwrap();

        let error = engine.join(session_id, "Late").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_submit_after_window_close_via_engine() {
        let (engine, game_id) = engine_with_game(vec![question(&[1])]);
        let session_id = engine.start(game_id, "alice").unwrap();
        let dana = engine.join(session_id, "Dana").unwrap();
        engine
            .mutate(game_id, "alice", SessionCommand::Advance)
            .unwrap();

        // Shift the window into the past so it has expired "now"
        let session = engine.registry().get(session_id).unwrap();
        registry::lock(&session).backdate_window(Duration::from_secs(31));

        assert_matches!(
            engine.submit_answer(dana, BTreeSet::from([1])),
            Err(Error::WindowClosed)
        );
    }

    #[test]
    fn test_status_views_by_role() {
        let (engine, game_id) = engine_with_game(vec![question(&[1])]);
        let session_id = engine.start(game_id, "alice").unwrap();

        assert_matches!(
            engine.status(session_id, Some("alice")).unwrap(),
            StatusView::Admin(_)
        );
        assert_matches!(
            engine.status(session_id, None).unwrap(),
            StatusView::Participant(ParticipantStatus::Waiting)
        );

        engine.mutate(game_id, "alice", SessionCommand::End).unwrap();
        assert_matches!(
            engine.status(session_id, Some("alice")),
            Err(Error::InvalidState(_))
        );
    }

    #[test]
    fn test_status_unknown_session() {
        let (engine, _) = engine_with_game(vec![question(&[1])]);
        assert_matches!(
            engine.status(SessionId::new(), None),
            Err(Error::SessionNotFound(_))
        );
    }

    #[test]
    fn test_submit_unknown_participant() {
        let (engine, _) = engine_with_game(vec![question(&[1])]);
        assert_matches!(
            engine.submit_answer(ParticipantId::new(), BTreeSet::from([0])),
            Err(Error::ParticipantNotFound(_))
        );
    }
}
