//! JSON-lines protocol between the host process and a dialog process.
//!
//! The host writes one request line to the dialog's stdin, optionally
//! followed by a stop line. The dialog answers with exactly one reply line
//! on stdout before exiting.

use std::io::{self, Write};

use feedback_core::{CancelReason, FeedbackOutcome, Limits, PickOutcome, PresenterError};
use feedback_images::{CapturedImage, IngestConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Initial window size in logical points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 700.0,
            height: 800.0,
        }
    }
}

/// Everything the feedback dialog needs to render a round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogSpec {
    pub work_summary: String,
    /// Drives the on-screen countdown only; the host enforces the deadline
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub window: WindowSize,
}

/// Settings for the single-image picker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickSpec {
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Messages sent from the host to the dialog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Feedback(DialogSpec),
    PickImage(PickSpec),
    /// Close the dialog now; any partial input is discarded
    Stop,
}

/// The dialog's single answer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogReply {
    Outcome { outcome: FeedbackOutcome },
    Picked { image: CapturedImage },
    PickCancelled { reason: CancelReason },
    /// The dialog could not be shown
    Failed { message: String },
}

impl DialogReply {
    pub fn from_pick(outcome: PickOutcome) -> Self {
        match outcome {
            PickOutcome::Picked { image } => DialogReply::Picked { image },
            PickOutcome::Cancelled { reason } => DialogReply::PickCancelled { reason },
            PickOutcome::TimedOut { .. } => DialogReply::PickCancelled {
                reason: CancelReason::Stopped,
            },
        }
    }

    /// Interpret the reply to a feedback request
    pub fn into_feedback_outcome(self) -> Result<FeedbackOutcome, PresenterError> {
        match self {
            DialogReply::Outcome { outcome } => Ok(outcome),
            DialogReply::Failed { message } => Err(PresenterError::Startup(message)),
            other => Err(PresenterError::Protocol(format!(
                "expected a feedback outcome, got {}",
                other.kind()
            ))),
        }
    }

    /// Interpret the reply to a pick request
    pub fn into_pick_outcome(self) -> Result<PickOutcome, PresenterError> {
        match self {
            DialogReply::Picked { image } => Ok(PickOutcome::Picked { image }),
            DialogReply::PickCancelled { reason } => Ok(PickOutcome::Cancelled { reason }),
            DialogReply::Failed { message } => Err(PresenterError::Startup(message)),
            other => Err(PresenterError::Protocol(format!(
                "expected a pick reply, got {}",
                other.kind()
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            DialogReply::Outcome { .. } => "outcome",
            DialogReply::Picked { .. } => "picked",
            DialogReply::PickCancelled { .. } => "pick_cancelled",
            DialogReply::Failed { .. } => "failed",
        }
    }
}

/// Write `message` as one line and flush
pub fn send<W: Write, T: Serialize>(writer: &mut W, message: &T) -> io::Result<()> {
    let line = serde_json::to_string(message)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", line)?;
    writer.flush()
}

/// Parse one protocol line
pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line.trim())
}
