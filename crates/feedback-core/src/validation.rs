use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bounds on what a single submission may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_images: usize,
    /// Counted in characters of the trimmed text
    pub max_text_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_images: 10,
            max_text_chars: 10_000,
        }
    }
}

/// Why a submission was refused
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Please provide text feedback, at least one image, or both")]
    Empty,

    #[error("Too many images ({count}); at most {max} are allowed")]
    TooManyImages { count: usize, max: usize },

    #[error("Feedback text is too long ({chars} characters); at most {max} are allowed")]
    TextTooLong { chars: usize, max: usize },
}

impl Limits {
    /// Check a complete submission
    pub fn validate(&self, text: Option<&str>, image_count: usize) -> Result<(), ValidationError> {
        let text = text.map(str::trim).unwrap_or_default();

        if text.is_empty() && image_count == 0 {
            return Err(ValidationError::Empty);
        }

        if image_count > self.max_images {
            return Err(ValidationError::TooManyImages {
                count: image_count,
                max: self.max_images,
            });
        }

        let chars = text.chars().count();
        if chars > self.max_text_chars {
            return Err(ValidationError::TextTooLong {
                chars,
                max: self.max_text_chars,
            });
        }

        Ok(())
    }

    /// Check whether one more image may be staged on top of `current`
    pub fn check_add_image(&self, current: usize) -> Result<(), ValidationError> {
        if current >= self.max_images {
            return Err(ValidationError::TooManyImages {
                count: current + 1,
                max: self.max_images,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_submission_rejected() {
        let limits = Limits::default();
        assert_eq!(limits.validate(None, 0), Err(ValidationError::Empty));
        assert_eq!(limits.validate(Some(""), 0), Err(ValidationError::Empty));
        assert_eq!(limits.validate(Some(" \n\t "), 0), Err(ValidationError::Empty));
    }

    #[test]
    fn test_whitespace_only_rejected_for_any_whitespace() {
        let limits = Limits::default();
        for ws in [" ", "\n", "\t", "\r\n", "\u{2003}", "  \n  \t"] {
            for repeat in 1..5 {
                let text = ws.repeat(repeat);
                assert_eq!(limits.validate(Some(&text), 0), Err(ValidationError::Empty));
            }
        }
    }

    #[test]
    fn test_text_only_and_images_only_accepted() {
        let limits = Limits::default();
        assert!(limits.validate(Some("looks good"), 0).is_ok());
        assert!(limits.validate(None, 2).is_ok());
        assert!(limits.validate(Some("   "), 1).is_ok());
    }

    #[test]
    fn test_text_length_boundary() {
        let limits = Limits::default();
        let at_limit = "a".repeat(10_000);
        let over_limit = "a".repeat(10_001);

        assert!(limits.validate(Some(&at_limit), 0).is_ok());
        assert_eq!(
            limits.validate(Some(&over_limit), 0),
            Err(ValidationError::TextTooLong {
                chars: 10_001,
                max: 10_000
            })
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let limits = Limits::default();
        let text = "é".repeat(10_000);
        assert!(text.len() > 10_000);
        assert!(limits.validate(Some(&text), 0).is_ok());
    }

    #[test]
    fn test_image_count_boundary() {
        let limits = Limits::default();
        assert!(limits.validate(None, 10).is_ok());
        assert_eq!(
            limits.validate(None, 11),
            Err(ValidationError::TooManyImages { count: 11, max: 10 })
        );
    }

    #[test]
    fn test_check_add_image() {
        let limits = Limits::default();
        assert!(limits.check_add_image(9).is_ok());
        assert_eq!(
            limits.check_add_image(10),
            Err(ValidationError::TooManyImages { count: 11, max: 10 })
        );
    }
}
