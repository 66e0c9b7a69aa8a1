//! # feedback-core
//!
//! Orchestration of feedback rounds: an agent asks, a [`Presenter`] shows a
//! dialog, and the [`FeedbackCollector`] hands back exactly one
//! [`FeedbackOutcome`] within the round's timeout.
//!
//! ## Key Types
//!
//! - [`FeedbackCollector`] - Runs one round at a time with timeout and re-validation
//! - [`Presenter`] - Seam between the collector and whatever shows the dialog
//! - [`StopSignal`] - Lets the collector close a dialog it no longer waits for
//! - [`DeliverySlot`] - One-shot hand-off, first writer wins
//! - [`Limits`] - Submission bounds shared by dialog and collector

mod collector;
mod delivery;
mod error;
mod outcome;
mod presenter;
mod request;
mod validation;

pub use collector::{FeedbackCollector, DEFAULT_TIMEOUT};
pub use delivery::{delivery_slot, DeliverySlot};
pub use error::FeedbackError;
pub use outcome::{CancelReason, FeedbackOutcome, PickOutcome, Submission};
pub use presenter::{Presenter, PresenterError, StopSignal};
pub use request::{resolve_timeout, FeedbackRequest};
pub use validation::{Limits, ValidationError};
