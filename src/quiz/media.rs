//! Media references for questions
//!
//! Questions may carry a reference to media held by an external store;
//! upload and serving of the actual bytes are out of scope for the core.
//! Currently only images are supported, with room for other formats later.

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Any kind of media content that can accompany a question
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub enum Media {
    /// Image media content
    Image(#[garde(dive)] Image),
}

/// A reference to an image held by the external media store
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub enum Image {
    /// An image identified by a store-issued id
    Reference {
        /// Identifier issued by the external media store
        #[garde(length(equal = crate::constants::media::ID_LENGTH))]
        id: String,
        /// Alternative text for accessibility and display fallbacks
        #[garde(length(max = crate::constants::media::MAX_ALT_LENGTH))]
        alt: String,
    },
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_reference_id_length_enforced() {
        let media = Media::Image(Image::Reference {
            id: "a".repeat(crate::constants::media::ID_LENGTH),
            alt: "a diagram".to_owned(),
        });
        assert!(media.validate().is_ok());

        let media = Media::Image(Image::Reference {
            id: "short".to_owned(),
            alt: String::new(),
        });
        assert!(media.validate().is_err());
    }
}
