use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::outcome::{FeedbackOutcome, PickOutcome};
use crate::request::FeedbackRequest;

/// Errors raised while showing a dialog
#[derive(Error, Debug)]
pub enum PresenterError {
    #[error("Failed to start dialog: {0}")]
    Startup(String),

    #[error("Dialog I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dialog protocol error: {0}")]
    Protocol(String),
}

/// Something that can put a dialog in front of the user.
///
/// Implementations block until the user finishes or `stop` is triggered,
/// and should return promptly once it is.
pub trait Presenter: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Show the feedback dialog for `request`
    fn present(
        &self,
        request: &FeedbackRequest,
        stop: &StopSignal,
    ) -> Result<FeedbackOutcome, PresenterError>;

    /// Show the single-image picker
    fn pick_image(&self, stop: &StopSignal) -> Result<PickOutcome, PresenterError>;
}

/// Cross-thread request to close the dialog. Triggering is idempotent.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(|e| e.into_inner());
        *stopped = true;
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until triggered or `timeout` passes. Returns whether it was triggered.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        // Too far off to represent means wait until triggered
        let deadline = Instant::now().checked_add(timeout);
        let mut stopped = lock.lock().unwrap_or_else(|e| e.into_inner());
        while !*stopped {
            stopped = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    match cvar.wait_timeout(stopped, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(e) => e.into_inner().0,
                    }
                }
                None => cvar.wait(stopped).unwrap_or_else(|e| e.into_inner()),
            };
        }
        *stopped
    }
}
