//! Configuration constants for the quiz session core
//!
//! This module contains the validation bounds and limits used throughout
//! the crate. They are enforced once at authoring/start time, never on the
//! polling path.

/// Game definition constants
pub mod game {
    /// Maximum number of questions allowed in a single game
    pub const MAX_QUESTION_COUNT: usize = 100;
    /// Maximum length of a game name in characters
    pub const MAX_NAME_LENGTH: usize = 200;
}

/// Question constants
pub mod question {
    /// Maximum length of the question text in characters
    pub const MAX_TEXT_LENGTH: usize = 200;
    /// Maximum number of answer options for a question
    pub const MAX_OPTION_COUNT: usize = 8;
    /// Maximum length of a single answer option in characters
    pub const MAX_OPTION_LENGTH: usize = 200;
    /// Minimum answer window duration in seconds
    pub const MIN_DURATION: u64 = 1;
    /// Maximum answer window duration in seconds
    pub const MAX_DURATION: u64 = 240;
}

/// Participant constants
pub mod participant {
    /// Maximum length of a participant display name in characters
    pub const MAX_NAME_LENGTH: usize = 40;
    /// Maximum number of participants in a single session
    pub const MAX_PARTICIPANT_COUNT: usize = 1000;
}

/// Media reference constants
pub mod media {
    /// Length of identifiers issued by the external media store
    pub const ID_LENGTH: usize = 16;
    /// Maximum length of alt text for accessibility
    pub const MAX_ALT_LENGTH: usize = 200;
}
