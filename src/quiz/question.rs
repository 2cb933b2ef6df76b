//! Question definitions and authoring-time validation
//!
//! A [`Question`] is a closed tagged variant over the three supported
//! answer shapes. Structural rules (index ranges, per-type option arity)
//! are checked once through [`Question::check_consistency`] together with
//! the garde bounds; the session engine never re-validates them on reads.

use std::{collections::BTreeSet, fmt::Display, str::FromStr, time::Duration};

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay, skip_serializing_none};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::media::Media;

/// A unique identifier for a question
///
/// Issued by the authoring layer; the core uses it as the key of each
/// participant's answer map.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct QuestionId(Uuid);

impl QuestionId {
    /// Creates a new random question ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuestionId {
    /// Creates a new random question ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for QuestionId {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QuestionId {
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

/// The answer shape of a question
///
/// The variant is fixed at authoring time; the engine branches on it only
/// to validate submission arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    /// Exactly one of several options is correct and one may be selected
    SingleChoice,
    /// One or more options are correct and any subset may be selected
    MultipleChoice,
    /// A true/false style question with exactly two options
    Judgement,
}

type ValidationResult = garde::Result;

/// Validates that the answer window duration falls within bounds
fn validate_duration(val: &Duration) -> ValidationResult {
    let bounds = crate::constants::question::MIN_DURATION..=crate::constants::question::MAX_DURATION;
    if bounds.contains(&val.as_secs()) && !val.is_zero() {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "duration is outside of the bounds [{},{}] seconds",
            crate::constants::question::MIN_DURATION,
            crate::constants::question::MAX_DURATION,
        )))
    }
}

/// A single timed question within a game
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Question {
    /// Identifier issued by the authoring layer
    #[garde(skip)]
    pub id: QuestionId,
    /// The question text displayed to participants
    #[garde(length(max = crate::constants::question::MAX_TEXT_LENGTH))]
    pub text: String,
    /// The answer shape of this question
    #[garde(skip)]
    pub kind: QuestionType,
    /// The ordered answer options
    #[garde(
        length(min = 2, max = crate::constants::question::MAX_OPTION_COUNT),
        inner(length(max = crate::constants::question::MAX_OPTION_LENGTH))
    )]
    pub options: Vec<String>,
    /// Indices into `options` that count as correct
    #[garde(skip)]
    pub correct: BTreeSet<usize>,
    /// How long the answer window stays open once this question starts
    #[garde(custom(|v, _| validate_duration(v)))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub duration: Duration,
    /// Maximum points awarded for an instant correct answer
    #[garde(range(min = 1))]
    pub points: u64,
    /// Optional media shown with the question
    #[garde(dive)]
    pub media: Option<Media>,
}

impl Question {
    /// Checks the cross-field rules garde cannot express
    ///
    /// Correct indices must address existing options, and the arity of the
    /// correct set and the option list must match the question type:
    /// `SingleChoice` and `Judgement` have exactly one correct option,
    /// `Judgement` exactly two options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first violated rule.
    pub fn check_consistency(&self) -> Result<()> {
        if self.correct.is_empty() {
            return Err(Error::Validation(
                "a question must have at least one correct option".to_owned(),
            ));
        }

        if let Some(&index) = self.correct.iter().find(|&&i| i >= self.options.len()) {
            return Err(Error::Validation(format!(
                "correct index {index} is out of range for {} options",
                self.options.len()
            )));
        }

        match self.kind {
            QuestionType::SingleChoice if self.correct.len() != 1 => Err(Error::Validation(
                "single choice questions must have exactly one correct option".to_owned(),
            )),
            QuestionType::Judgement if self.options.len() != 2 => Err(Error::Validation(
                "judgement questions must have exactly two options".to_owned(),
            )),
            QuestionType::Judgement if self.correct.len() != 1 => Err(Error::Validation(
                "judgement questions must have exactly one correct option".to_owned(),
            )),
            _ => Ok(()),
        }
    }

    /// Whether a submission may select more than one option
    pub fn allows_multiple(&self) -> bool {
        matches!(self.kind, QuestionType::MultipleChoice)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn single_choice() -> Question {
        Question {
            id: QuestionId::new(),
            text: "What is the capital of France?".to_owned(),
            kind: QuestionType::SingleChoice,
            options: vec![
                "Lyon".to_owned(),
                "Paris".to_owned(),
                "Marseille".to_owned(),
            ],
            correct: BTreeSet::from([1]),
            duration: Duration::from_secs(10),
            points: 100,
            media: None,
        }
    }

    #[test]
    fn test_valid_question_passes() {
        let question = single_choice();
        assert!(question.validate().is_ok());
        assert!(question.check_consistency().is_ok());
    }

    #[test]
    fn test_text_too_long() {
        let mut question = single_choice();
        question.text = "a".repeat(crate::constants::question::MAX_TEXT_LENGTH + 1);
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_empty_correct_set_rejected() {
        let mut question = single_choice();
        question.correct.clear();
        assert!(question.check_consistency().is_err());
    }

    #[test]
    fn test_correct_index_out_of_range() {
        let mut question = single_choice();
        question.correct = BTreeSet::from([3]);
        assert!(question.check_consistency().is_err());
    }

    #[test]
    fn test_single_choice_multiple_correct_rejected() {
        let mut question = single_choice();
        question.correct = BTreeSet::from([0, 1]);
        assert!(question.check_consistency().is_err());
    }

    #[test]
    fn test_judgement_requires_two_options() {
        let mut question = single_choice();
        question.kind = QuestionType::Judgement;
        assert!(question.check_consistency().is_err());

        question.options = vec!["True".to_owned(), "False".to_owned()];
        question.correct = BTreeSet::from([0]);
        assert!(question.check_consistency().is_ok());
    }

    #[test]
    fn test_multiple_choice_allows_several_correct() {
        let mut question = single_choice();
        question.kind = QuestionType::MultipleChoice;
        question.correct = BTreeSet::from([0, 2]);
        assert!(question.check_consistency().is_ok());
        assert!(question.allows_multiple());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut question = single_choice();
        question.duration = Duration::ZERO;
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_question_id_serde_round_trip() {
        let id = QuestionId::new();
        let serialized = serde_json::to_string(&id).unwrap();
        let deserialized: QuestionId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, deserialized);
    }
}
