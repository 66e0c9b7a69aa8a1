use std::time::Duration;

use chrono::{DateTime, Local};
use feedback_images::CapturedImage;
use serde::{Deserialize, Serialize};

use crate::error::FeedbackError;
use crate::validation::ValidationError;

/// Why a round ended without a usable result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CancelReason {
    /// Cancel button
    UserCancelled,
    /// Window close control
    WindowClosed,
    /// The collector asked the dialog to close
    Stopped,
    /// Another round already owns the dialog
    Busy,
    PresenterFailed(String),
    /// The presenter delivered a submission that failed validation
    Rejected(ValidationError),
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::UserCancelled => write!(f, "User cancelled the dialog"),
            CancelReason::WindowClosed => write!(f, "User closed the dialog window"),
            CancelReason::Stopped => write!(f, "Dialog was closed by the server"),
            CancelReason::Busy => write!(f, "Another feedback dialog is already open"),
            CancelReason::PresenterFailed(message) => {
                write!(f, "Failed to open the feedback dialog: {}", message)
            }
            CancelReason::Rejected(e) => write!(f, "Feedback rejected: {}", e),
        }
    }
}

/// What the user handed back from a feedback round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub text: Option<String>,
    pub images: Vec<CapturedImage>,
    pub submitted_at: DateTime<Local>,
}

/// The final outcome of a feedback round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Submitted {
        text: Option<String>,
        images: Vec<CapturedImage>,
        submitted_at: DateTime<Local>,
    },
    Cancelled {
        reason: CancelReason,
    },
    TimedOut {
        elapsed: Duration,
    },
}

impl FeedbackOutcome {
    /// A submission stamped with the current local time.
    ///
    /// Text that is empty after trimming is stored as `None`.
    pub fn submitted(text: Option<String>, images: Vec<CapturedImage>) -> Self {
        Self::Submitted {
            text: text
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            images,
            submitted_at: Local::now(),
        }
    }

    pub fn cancelled(reason: CancelReason) -> Self {
        Self::Cancelled { reason }
    }

    pub fn timed_out(elapsed: Duration) -> Self {
        Self::TimedOut { elapsed }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "submitted",
            Self::Cancelled { .. } => "cancelled",
            Self::TimedOut { .. } => "timed_out",
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }

    pub fn into_result(self) -> Result<Submission, FeedbackError> {
        match self {
            Self::Submitted {
                text,
                images,
                submitted_at,
            } => Ok(Submission {
                text,
                images,
                submitted_at,
            }),
            Self::Cancelled { reason } => Err(reason.into()),
            Self::TimedOut { elapsed } => Err(FeedbackError::Timeout(elapsed)),
        }
    }
}

/// The final outcome of a single-image pick round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PickOutcome {
    Picked { image: CapturedImage },
    Cancelled { reason: CancelReason },
    TimedOut { elapsed: Duration },
}

impl PickOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Picked { .. } => "picked",
            Self::Cancelled { .. } => "cancelled",
            Self::TimedOut { .. } => "timed_out",
        }
    }

    pub fn into_result(self) -> Result<CapturedImage, FeedbackError> {
        match self {
            Self::Picked { image } => Ok(image),
            Self::Cancelled { reason } => Err(reason.into()),
            Self::TimedOut { elapsed } => Err(FeedbackError::Timeout(elapsed)),
        }
    }
}
