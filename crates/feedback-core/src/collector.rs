use std::sync::mpsc::RecvTimeoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use feedback_logging::{LogEvent, Logger, RoundKind};

use crate::delivery::delivery_slot;
use crate::outcome::{CancelReason, FeedbackOutcome, PickOutcome};
use crate::presenter::{Presenter, StopSignal};
use crate::request::FeedbackRequest;
use crate::validation::Limits;

/// Default wait for the user when the caller does not say otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// What came back across the thread boundary
enum Handoff<T> {
    Delivered(T),
    TimedOut(Duration),
    /// The worker went away without delivering
    Abandoned(String),
}

/// Marks a dialog as open; cleared on drop.
///
/// Owned by the presenter thread, so a dialog that is still closing after
/// its round timed out keeps new rounds out.
struct RoundClaim(Arc<AtomicBool>);

impl Drop for RoundClaim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs feedback rounds against a [`Presenter`].
///
/// The presenter runs on its own thread; the calling thread waits on a
/// single-slot hand-off with the round's timeout. On timeout the presenter
/// is told to stop and the round ends immediately, so the caller is never
/// held past its deadline by a slow dialog. Only one dialog is open at a
/// time: new rounds are refused until the previous dialog has closed.
pub struct FeedbackCollector {
    presenter: Arc<dyn Presenter>,
    limits: Limits,
    default_timeout: Option<Duration>,
    logger: Arc<Logger>,
    active: Arc<AtomicBool>,
}

impl FeedbackCollector {
    pub fn new(presenter: Arc<dyn Presenter>, logger: Arc<Logger>) -> Self {
        Self {
            presenter,
            limits: Limits::default(),
            default_timeout: Some(DEFAULT_TIMEOUT),
            logger,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Show the feedback dialog and wait for the user's answer
    pub fn collect(&self, request: FeedbackRequest) -> FeedbackOutcome {
        let round_id = request.round_id.to_string();
        let started = Instant::now();

        self.logger.log(&LogEvent::RoundStarted {
            round_id: round_id.clone(),
            kind: RoundKind::Feedback,
            summary_preview: request.summary_preview(),
            timeout_secs: request.timeout.map(|t| t.as_secs()),
        });

        let outcome = match self.claim() {
            Some(claim) => self.run_feedback(&round_id, request, claim),
            None => {
                warn!(round_id = %round_id, "Feedback dialog already open; rejecting round");
                FeedbackOutcome::cancelled(CancelReason::Busy)
            }
        };

        let duration = started.elapsed();
        match &outcome {
            FeedbackOutcome::Submitted { text, images, .. } => {
                self.log_delivered(
                    &round_id,
                    text.as_deref().map_or(0, |t| t.chars().count()),
                    images.len(),
                    duration,
                );
            }
            FeedbackOutcome::Cancelled { reason } => {
                self.log_cancelled(&round_id, reason, duration)
            }
            FeedbackOutcome::TimedOut { elapsed } => self.log_timed_out(&round_id, *elapsed),
        }
        outcome
    }

    /// Show the single-image picker with the default timeout
    pub fn pick_image(&self) -> PickOutcome {
        let round_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        self.logger.log(&LogEvent::RoundStarted {
            round_id: round_id.clone(),
            kind: RoundKind::PickImage,
            summary_preview: String::new(),
            timeout_secs: self.default_timeout.map(|t| t.as_secs()),
        });

        let outcome = match self.claim() {
            Some(claim) => self.run_pick(&round_id, claim),
            None => {
                warn!(round_id = %round_id, "Dialog already open; rejecting image pick");
                PickOutcome::Cancelled {
                    reason: CancelReason::Busy,
                }
            }
        };

        let duration = started.elapsed();
        match &outcome {
            PickOutcome::Picked { .. } => self.log_delivered(&round_id, 0, 1, duration),
            PickOutcome::Cancelled { reason } => self.log_cancelled(&round_id, reason, duration),
            PickOutcome::TimedOut { elapsed } => self.log_timed_out(&round_id, *elapsed),
        }
        outcome
    }

    fn claim(&self) -> Option<RoundClaim> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RoundClaim(Arc::clone(&self.active)))
    }

    fn run_feedback(
        &self,
        round_id: &str,
        request: FeedbackRequest,
        claim: RoundClaim,
    ) -> FeedbackOutcome {
        self.log_presenter_started(round_id);

        let presenter = Arc::clone(&self.presenter);
        let timeout = request.timeout;
        match self.hand_off(timeout, claim, move |stop| presenter.present(&request, stop)) {
            Handoff::Delivered(Ok(outcome)) => self.review(round_id, outcome),
            Handoff::Delivered(Err(e)) => {
                warn!(round_id, error = %e, "Presenter failed");
                FeedbackOutcome::cancelled(CancelReason::PresenterFailed(e.to_string()))
            }
            Handoff::TimedOut(elapsed) => FeedbackOutcome::timed_out(elapsed),
            Handoff::Abandoned(message) => {
                warn!(round_id, "{}", message);
                FeedbackOutcome::cancelled(CancelReason::PresenterFailed(message))
            }
        }
    }

    fn run_pick(&self, round_id: &str, claim: RoundClaim) -> PickOutcome {
        self.log_presenter_started(round_id);

        let presenter = Arc::clone(&self.presenter);
        match self.hand_off(self.default_timeout, claim, move |stop| {
            presenter.pick_image(stop)
        }) {
            Handoff::Delivered(Ok(outcome)) => outcome,
            Handoff::Delivered(Err(e)) => {
                warn!(round_id, error = %e, "Presenter failed");
                PickOutcome::Cancelled {
                    reason: CancelReason::PresenterFailed(e.to_string()),
                }
            }
            Handoff::TimedOut(elapsed) => PickOutcome::TimedOut { elapsed },
            Handoff::Abandoned(message) => {
                warn!(round_id, "{}", message);
                PickOutcome::Cancelled {
                    reason: CancelReason::PresenterFailed(message),
                }
            }
        }
    }

    /// Re-check a submission before it leaves the collector
    fn review(&self, round_id: &str, outcome: FeedbackOutcome) -> FeedbackOutcome {
        match outcome {
            FeedbackOutcome::Submitted {
                text,
                images,
                submitted_at,
            } => {
                let text = text.filter(|t| !t.trim().is_empty());
                match self.limits.validate(text.as_deref(), images.len()) {
                    Ok(()) => FeedbackOutcome::Submitted {
                        text,
                        images,
                        submitted_at,
                    },
                    Err(e) => {
                        self.logger.log(&LogEvent::SubmissionRejected {
                            round_id: round_id.to_string(),
                            reason: e.to_string(),
                        });
                        FeedbackOutcome::cancelled(CancelReason::Rejected(e))
                    }
                }
            }
            other => other,
        }
    }

    /// Run `work` on a presenter thread and wait for its single result.
    ///
    /// The thread holds `claim` until `work` returns, even past a timeout.
    fn hand_off<T, F>(&self, timeout: Option<Duration>, claim: RoundClaim, work: F) -> Handoff<T>
    where
        T: Send + 'static,
        F: FnOnce(&StopSignal) -> T + Send + 'static,
    {
        let (slot, rx) = delivery_slot();
        let stop = StopSignal::new();
        let worker_stop = stop.clone();

        let spawned = thread::Builder::new()
            .name("feedback-presenter".to_string())
            .spawn(move || {
                let value = work(&worker_stop);
                drop(claim);
                if !slot.deliver(value) {
                    debug!("Round already finished; discarding late presenter result");
                }
            });
        if let Err(e) = spawned {
            return Handoff::Abandoned(format!("failed to start presenter thread: {}", e));
        }

        let started = Instant::now();
        let received = match timeout {
            Some(timeout) => rx.recv_timeout(timeout),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(value) => Handoff::Delivered(value),
            Err(RecvTimeoutError::Timeout) => {
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Round timed out; stopping dialog"
                );
                stop.trigger();
                Handoff::TimedOut(started.elapsed())
            }
            Err(RecvTimeoutError::Disconnected) => {
                Handoff::Abandoned("presenter exited without a result".to_string())
            }
        }
    }

    fn log_presenter_started(&self, round_id: &str) {
        self.logger.log(&LogEvent::PresenterStarted {
            round_id: round_id.to_string(),
            presenter: self.presenter.name().to_string(),
        });
    }

    fn log_delivered(&self, round_id: &str, text_chars: usize, image_count: usize, duration: Duration) {
        self.logger.log(&LogEvent::OutcomeDelivered {
            round_id: round_id.to_string(),
            text_chars,
            image_count,
            duration_secs: duration.as_secs_f64(),
        });
    }

    fn log_cancelled(&self, round_id: &str, reason: &CancelReason, duration: Duration) {
        self.logger.log(&LogEvent::RoundCancelled {
            round_id: round_id.to_string(),
            reason: reason.to_string(),
            duration_secs: duration.as_secs_f64(),
        });
    }

    fn log_timed_out(&self, round_id: &str, elapsed: Duration) {
        self.logger.log(&LogEvent::RoundTimedOut {
            round_id: round_id.to_string(),
            elapsed_secs: elapsed.as_secs_f64(),
        });
    }
}
