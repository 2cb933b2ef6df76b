//! Session lifecycle and the answer window
//!
//! This module contains the state machine that drives one timed run of a
//! game's questions. A session moves from the lobby through each question
//! in order and into a results phase; the administrator's `advance` and
//! `end` commands are the only mutations besides participant joins and
//! answer submissions. Every time-sensitive operation takes an explicit
//! `now` so the server clock stays the single authority and tests stay
//! deterministic.

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use web_time::{Duration, SystemTime};

use crate::{
    error::{Error, Result},
    game::{Game, GameId},
    participant::{self, Answer, Participant, ParticipantId},
    quiz::question::Question,
    session_id::SessionId,
    view::ResultsView,
};

/// The lifecycle phase of a session, derived from `position` and `active`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Waiting for participants; no question has been shown yet
    Lobby,
    /// Question `k` is current and its answer window may be open
    QuestionActive(usize),
    /// All questions have been played; the session awaits `end`
    ResultsPending,
    /// The session is terminal and read-only; results are queryable
    Ended,
}

/// One timed run of a game's questions by a group of participants
///
/// The question list and owner identity are snapshotted at start, so later
/// edits to the game definition cannot affect a running session. All
/// mutations of `position`, `window_started_at`, and `active` happen under
/// the registry's per-session lock.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    /// The short join code identifying this session
    id: SessionId,
    /// The game this session runs
    game_id: GameId,
    /// Owner identity snapshotted from the game at start
    owner: String,
    /// Question list snapshotted from the game at start
    questions: Vec<Question>,
    /// Index of the current question; -1 in the lobby, `n` once past the end
    position: i64,
    /// When the current question's window opened; set on each advance into
    /// a question, cleared past the last question
    window_started_at: Option<SystemTime>,
    /// False once the session has ended
    active: bool,
    /// All participants that joined during the lobby
    participants: HashMap<ParticipantId, Participant>,
    /// Monotonic join counter backing the leaderboard tie-break
    join_counter: u64,
    /// Results computed once after the session ends
    #[serde(skip)]
    results: once_cell_serde::sync::OnceCell<ResultsView>,
}

impl Session {
    /// Creates a session in the lobby for the given game
    pub fn new(id: SessionId, game: &Game) -> Self {
        Self {
            id,
            game_id: game.id,
            owner: game.owner.clone(),
            questions: game.questions.clone(),
            position: -1,
            window_started_at: None,
            active: true,
            participants: HashMap::new(),
            join_counter: 0,
            results: once_cell_serde::sync::OnceCell::new(),
        }
    }

    /// The session's join code
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The game this session runs
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// The owner identity snapshotted at start
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The raw position: -1 in the lobby, `n` once past the last question
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Whether the session is still running
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// When the current question's window opened, if one is current
    pub fn window_started_at(&self) -> Option<SystemTime> {
        self.window_started_at
    }

    /// The number of questions in this session
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// The snapshotted question list
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The current question and its index, if the session is on one
    pub fn current_question(&self) -> Option<(usize, &Question)> {
        match self.state() {
            SessionState::QuestionActive(index) => Some((index, &self.questions[index])),
            _ => None,
        }
    }

    /// Looks up a participant by id
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    /// The number of participants that joined
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Participants in join order, for scoring and the tie-break rule
    pub fn participants_in_join_order(&self) -> Vec<&Participant> {
        self.participants
            .values()
            .sorted_by_key(|participant| participant.joined)
            .collect()
    }

    /// Derives the lifecycle phase from `position` and `active`
    pub fn state(&self) -> SessionState {
        if !self.active {
            return SessionState::Ended;
        }
        match self.position {
            -1 => SessionState::Lobby,
            p if (p as usize) < self.questions.len() => SessionState::QuestionActive(p as usize),
            _ => SessionState::ResultsPending,
        }
    }

    /// Time left in the current question's answer window
    ///
    /// Zero whenever no window is open, including in the lobby and the
    /// results phase.
    pub fn remaining(&self, now: SystemTime) -> Duration {
        match (self.state(), self.window_started_at) {
            (SessionState::QuestionActive(index), Some(started)) => {
                let deadline = started + self.questions[index].duration;
                deadline.duration_since(now).unwrap_or(Duration::ZERO)
            }
            _ => Duration::ZERO,
        }
    }

    /// Whether the current question's window has closed
    ///
    /// True outside `QuestionActive` as well; the admin status view
    /// reports this flag directly.
    pub fn window_closed(&self, now: SystemTime) -> bool {
        self.remaining(now).is_zero()
    }

    /// Moves to the next question, or past the last one into results
    ///
    /// Entering a question opens its answer window at `now`; the previous
    /// window implicitly closes even if it had time left. `position` only
    /// ever grows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] from `ResultsPending` or `Ended`.
    pub fn advance(&mut self, now: SystemTime) -> Result<()> {
        match self.state() {
            SessionState::Lobby | SessionState::QuestionActive(_) => {
                self.position += 1;
                self.window_started_at = if (self.position as usize) < self.questions.len() {
                    Some(now)
                } else {
                    None
                };
                Ok(())
            }
            SessionState::ResultsPending => {
                Err(Error::InvalidState("cannot advance past the results phase"))
            }
            SessionState::Ended => Err(Error::InvalidState("session has ended")),
        }
    }

    /// Ends the session, making it terminal and read-only
    ///
    /// Permitted from the lobby, any question, or the results phase.
    /// Deliberately not idempotent: re-ending surfaces client bugs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the session already ended.
    pub fn end(&mut self) -> Result<()> {
        if !self.active {
            return Err(Error::InvalidState("session has already ended"));
        }
        self.active = false;
        self.window_started_at = None;
        Ok(())
    }

    /// Adds a participant while the session is still in the lobby
    ///
    /// The display name is screened but not required to be unique. Late
    /// joins are rejected: a participant joining mid-game would face
    /// unanswerable questions and a misleading rank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JoinClosed`] outside the lobby,
    /// [`Error::SessionFull`] at capacity, or [`Error::Validation`] for a
    /// rejected name.
    pub fn join(&mut self, display_name: &str) -> Result<ParticipantId> {
        if !matches!(self.state(), SessionState::Lobby) {
            return Err(Error::JoinClosed);
        }
        if self.participants.len() >= crate::constants::participant::MAX_PARTICIPANT_COUNT {
            return Err(Error::SessionFull);
        }

        let name = participant::validate_display_name(display_name)?;

        let id = ParticipantId::new();
        let joined = self.join_counter;
        self.join_counter += 1;
        self.participants
            .insert(id, Participant::new(id, self.id, name, joined));

        Ok(id)
    }

    /// Records or overwrites a participant's answer to the current question
    ///
    /// Last write before window close wins; the stored window-start
    /// timestamp is copied into the answer so scoring stays independent of
    /// later state changes. Correctness is not evaluated here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when no question is current,
    /// [`Error::WindowClosed`] after the window elapsed,
    /// [`Error::Validation`] for malformed indices, or
    /// [`Error::ParticipantNotFound`] for an unknown participant.
    pub fn submit_answer(
        &mut self,
        participant_id: ParticipantId,
        indices: BTreeSet<usize>,
        now: SystemTime,
    ) -> Result<()> {
        let SessionState::QuestionActive(index) = self.state() else {
            return Err(Error::InvalidState("no question is accepting answers"));
        };
        let Some(window_started_at) = self.window_started_at else {
            return Err(Error::InvalidState("no answer window is open"));
        };

        if self.remaining(now).is_zero() {
            return Err(Error::WindowClosed);
        }

        let question = &self.questions[index];
        if indices.is_empty() {
            return Err(Error::Validation(
                "at least one option must be selected".to_owned(),
            ));
        }
        if let Some(&out_of_range) = indices.iter().find(|&&i| i >= question.options.len()) {
            return Err(Error::Validation(format!(
                "option index {out_of_range} is out of range for {} options",
                question.options.len()
            )));
        }
        if !question.allows_multiple() && indices.len() > 1 {
            return Err(Error::Validation(
                "this question accepts a single option".to_owned(),
            ));
        }

        let question_id = question.id;
        let participant = self
            .participants
            .get_mut(&participant_id)
            .ok_or(Error::ParticipantNotFound(participant_id))?;

        participant.answers.insert(
            question_id,
            Answer {
                indices,
                window_started_at,
                submitted_at: now,
            },
        );

        Ok(())
    }

    /// The results view, computed once after the session ends
    ///
    /// Repeated calls return identical data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while the session is still active.
    pub fn results(&self) -> Result<ResultsView> {
        if self.active {
            return Err(Error::InvalidState("session has not ended"));
        }
        Ok(self.results.get_or_init(|| ResultsView::compute(self)).clone())
    }

    /// Shifts the open window into the past, to exercise expiry in tests
    #[cfg(test)]
    pub(crate) fn backdate_window(&mut self, by: Duration) {
        if let Some(started) = self.window_started_at {
            self.window_started_at = Some(started - by);
        }
    }
}
