//! Correctness evaluation and time-decayed score aggregation
//!
//! Scoring is pull-model: nothing here is computed when an answer is
//! submitted. Correctness is exact set equality against the question's
//! correct-index set (no partial credit), and a correct answer earns
//! `log10(1 + duration − time_taken) × points`, so an instant answer earns
//! the full logarithmic bonus and an answer on the buzzer earns zero.

use itertools::Itertools;
use serde::Serialize;

use crate::{
    participant::{Answer, Participant, ParticipantId},
    quiz::question::{Question, QuestionId},
};

/// Whether a recorded answer exactly matches the question's correct set
pub fn is_correct(question: &Question, answer: &Answer) -> bool {
    answer.indices == question.correct
}

/// Seconds between window open and submission, clamped to `[0, duration]`
///
/// A missing answer counts as the full duration, which makes the score
/// formula yield `log10(1) = 0` for a non-answer.
pub fn time_taken(question: &Question, answer: Option<&Answer>) -> f64 {
    let duration = question.duration.as_secs_f64();
    match answer {
        None => duration,
        Some(answer) => answer
            .submitted_at
            .duration_since(answer.window_started_at)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64())
            .clamp(0.0, duration),
    }
}

/// The score one answer earns on one question
pub fn answer_score(question: &Question, answer: Option<&Answer>) -> f64 {
    match answer {
        Some(recorded) if is_correct(question, recorded) => {
            let duration = question.duration.as_secs_f64();
            (1.0 + duration - time_taken(question, answer)).log10() * question.points as f64
        }
        _ => 0.0,
    }
}

/// A participant's total score over all questions
pub fn total_score(questions: &[Question], participant: &Participant) -> f64 {
    questions
        .iter()
        .map(|question| answer_score(question, participant.answers.get(&question.id)))
        .sum()
}

/// One row of the final leaderboard
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    /// The participant this row belongs to
    pub participant: ParticipantId,
    /// The participant's display name
    pub name: String,
    /// Total score over all questions
    pub total: f64,
}

/// Ranks participants by total score, descending
///
/// `participants` must be in join order; the sort is stable, so
/// participants with equal totals keep that order. The join-order
/// tie-break is a design choice, not a behavioral guarantee inherited
/// from anywhere.
pub fn leaderboard(questions: &[Question], participants: &[&Participant]) -> Vec<LeaderboardEntry> {
    participants
        .iter()
        .map(|participant| LeaderboardEntry {
            participant: participant.id,
            name: participant.name.clone(),
            total: total_score(questions, participant),
        })
        .sorted_by(|a, b| b.total.total_cmp(&a.total))
        .collect()
}

/// Per-question aggregate metrics for the administrator's results view
#[derive(Debug, Clone, Serialize)]
pub struct QuestionStats {
    /// The question these metrics describe
    pub question: QuestionId,
    /// Percentage of participants who answered correctly, `0..=100`
    pub correct_percentage: f64,
    /// Mean clamped response time in seconds over participants who
    /// submitted; zero when nobody did
    pub average_response_time: f64,
}

/// Computes the per-question aggregates over all participants
pub fn question_stats(questions: &[Question], participants: &[&Participant]) -> Vec<QuestionStats> {
    questions
        .iter()
        .map(|question| {
            let answers = participants
                .iter()
                .filter_map(|participant| participant.answers.get(&question.id))
                .collect_vec();

            let correct = answers
                .iter()
                .filter(|answer| is_correct(question, answer))
                .count();

            let correct_percentage = if participants.is_empty() {
                0.0
            } else {
                100.0 * correct as f64 / participants.len() as f64
            };

            let average_response_time = if answers.is_empty() {
                0.0
            } else {
                answers
                    .iter()
                    .map(|answer| time_taken(question, Some(answer)))
                    .sum::<f64>()
                    / answers.len() as f64
            };

            QuestionStats {
                question: question.id,
                correct_percentage,
                average_response_time,
            }
        })
        .collect()
}
