use std::time::Duration;

use thiserror::Error;

use crate::outcome::CancelReason;
use crate::validation::ValidationError;

/// Failure of a collection round, as reported back to the calling agent
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("{0}")]
    UserCancelled(String),

    #[error("Timed out after {}s waiting for feedback; please try again", .0.as_secs())]
    Timeout(Duration),

    #[error("Feedback rejected: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Image error: {0}")]
    ImageLoad(#[from] feedback_images::ImageError),

    #[error("Failed to open the feedback dialog: {0}")]
    PresenterStartup(String),

    #[error("Another feedback dialog is already open")]
    Busy,
}

impl From<CancelReason> for FeedbackError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Busy => FeedbackError::Busy,
            CancelReason::PresenterFailed(message) => FeedbackError::PresenterStartup(message),
            CancelReason::Rejected(e) => FeedbackError::ValidationFailed(e),
            other => FeedbackError::UserCancelled(other.to_string()),
        }
    }
}
