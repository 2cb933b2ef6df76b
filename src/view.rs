//! Role-specific snapshots served to polling clients
//!
//! Both roles poll the same session; the projection decides what each may
//! see. The participant view never contains the correct-index set while
//! the answer window is open, which is what makes deferred correctness
//! evaluation safe: there is simply no path that could leak it early.

use serde::Serialize;
use serde_with::skip_serializing_none;
use web_time::{Duration, SystemTime};

use crate::{
    error::{Error, Result},
    game::GameId,
    quiz::media::Media,
    scoring::{self, LeaderboardEntry, QuestionStats},
    session::{Session, SessionState},
    session_id::SessionId,
};

/// The administrator's status snapshot
///
/// Exposes raw progress fields; the admin client derives its countdown
/// from `window_started_at` and re-derives it on every poll rather than
/// trusting local drift.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct AdminStatus {
    /// Whether the session is still running
    pub active: bool,
    /// Raw position: -1 in the lobby, question count once past the end
    pub position: i64,
    /// Number of questions in the session
    pub total_questions: usize,
    /// When the current question's window opened, if one is current
    pub window_started_at: Option<SystemTime>,
    /// Whether the current answer window has elapsed
    pub answer_window_closed: bool,
}

impl AdminStatus {
    /// Projects the administrator's view of a session
    pub fn of(session: &Session, now: SystemTime) -> Self {
        Self {
            active: session.is_active(),
            position: session.position(),
            total_questions: session.total_questions(),
            window_started_at: session.window_started_at(),
            answer_window_closed: session.window_closed(now),
        }
    }
}

/// The disclosed correct-index set of a question whose window has closed
///
/// Built only for questions the session has moved past or timed out; the
/// currently open question never appears here.
#[derive(Debug, Clone, Serialize)]
pub struct RevealedAnswer {
    /// Index of the question being revealed
    pub index: usize,
    /// The correct option indices for that question only
    pub correct: Vec<usize>,
}

impl RevealedAnswer {
    fn of(session: &Session, index: usize) -> Self {
        Self {
            index,
            correct: session.questions()[index].correct.iter().copied().collect(),
        }
    }
}

/// The participant's status snapshot
///
/// The correct-index set appears only as a [`RevealedAnswer`], and only
/// once the window for that question can no longer accept submissions:
/// either its timer expired or the session advanced past it.
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub enum ParticipantStatus {
    /// The session is still in the lobby
    Waiting,
    /// A question is open for answers
    Question {
        /// Index of the current question
        index: usize,
        /// Number of questions in the session
        total_questions: usize,
        /// The question text
        text: String,
        /// The answer options, in order
        options: Vec<String>,
        /// Optional media shown with the question
        media: Option<Media>,
        /// Time left in the answer window
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
        /// The previous question's correct set, if one was played
        revealed: Option<RevealedAnswer>,
    },
    /// The current question's window timed out; its correct set is disclosed
    Reveal {
        /// Index of the question being revealed
        index: usize,
        /// The correct option indices for that question only
        correct: Vec<usize>,
    },
    /// All questions have been played; results are not yet published
    ResultsPending {
        /// The last question's correct set
        revealed: Option<RevealedAnswer>,
    },
}

impl ParticipantStatus {
    /// Projects the participant's view of a session that has not ended
    fn of(session: &Session, now: SystemTime) -> Self {
        match session.state() {
            SessionState::Lobby => Self::Waiting,
            SessionState::QuestionActive(index) => {
                let question = &session.questions()[index];
                let remaining = session.remaining(now);
                if remaining.is_zero() {
                    Self::Reveal {
                        index,
                        correct: question.correct.iter().copied().collect(),
                    }
                } else {
                    Self::Question {
                        index,
                        total_questions: session.total_questions(),
                        text: question.text.clone(),
                        options: question.options.clone(),
                        media: question.media.clone(),
                        remaining,
                        revealed: index
                            .checked_sub(1)
                            .map(|previous| RevealedAnswer::of(session, previous)),
                    }
                }
            }
            SessionState::ResultsPending | SessionState::Ended => Self::ResultsPending {
                revealed: session
                    .total_questions()
                    .checked_sub(1)
                    .map(|last| RevealedAnswer::of(session, last)),
            },
        }
    }
}

/// A role-specific status snapshot
#[derive(Debug, Clone, Serialize, derive_more::From)]
pub enum StatusView {
    /// The administrator's projection
    Admin(AdminStatus),
    /// The participant's projection
    Participant(ParticipantStatus),
}

impl StatusView {
    /// Projects a session for the given requester identity
    ///
    /// The admin view is served only when the identity matches the owning
    /// game's owner; everyone else, including anonymous pollers, gets the
    /// participant view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once the session has ended; only
    /// the results endpoint is valid then.
    pub fn of(session: &Session, now: SystemTime, identity: Option<&str>) -> Result<Self> {
        if !session.is_active() {
            return Err(Error::InvalidState(
                "session has ended; fetch results instead",
            ));
        }

        if identity.is_some_and(|identity| identity == session.owner()) {
            Ok(AdminStatus::of(session, now).into())
        } else {
            Ok(ParticipantStatus::of(session, now).into())
        }
    }
}

/// The final results of an ended session
#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    /// The session these results belong to
    pub session: SessionId,
    /// The game the session ran
    pub game: GameId,
    /// Number of participants that joined
    pub participant_count: usize,
    /// Participants ranked by total score, descending; ties in join order
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Per-question aggregate metrics
    pub questions: Vec<QuestionStats>,
}

impl ResultsView {
    /// Computes the results of a session
    ///
    /// Called once through the session's results cache after it ends.
    pub(crate) fn compute(session: &Session) -> Self {
        let participants = session.participants_in_join_order();
        Self {
            session: session.id(),
            game: session.game_id(),
            participant_count: participants.len(),
            leaderboard: scoring::leaderboard(session.questions(), &participants),
            questions: scoring::question_stats(session.questions(), &participants),
        }
    }
}
