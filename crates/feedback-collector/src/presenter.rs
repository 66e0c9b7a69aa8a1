//! Shows dialogs by running `feedback-collector dialog` as a child process.
//!
//! The windowing event loop can only be created once per process, so every
//! round gets a fresh child. Requests and replies travel as JSON lines over
//! the child's stdin and stdout; its stderr is inherited so dialog logs end
//! up next to ours.

use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use feedback_core::{
    CancelReason, FeedbackOutcome, FeedbackRequest, Limits, PickOutcome, Presenter,
    PresenterError, StopSignal,
};
use feedback_dialog::protocol;
use feedback_dialog::{DialogReply, DialogSpec, HostMessage, PickSpec, WindowSize};
use feedback_images::IngestConfig;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// How long a stopped dialog gets to close on its own before it is killed
pub const DEFAULT_GRACE: Duration = Duration::from_secs(3);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ProcessPresenter {
    program: PathBuf,
    args: Vec<String>,
    limits: Limits,
    ingest: IngestConfig,
    window: WindowSize,
    grace: Duration,
}

impl ProcessPresenter {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            limits: Limits::default(),
            ingest: IngestConfig::default(),
            window: WindowSize::default(),
            grace: DEFAULT_GRACE,
        }
    }

    /// Re-run the current binary with the hidden `dialog` subcommand
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, vec!["dialog".to_string()]))
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_ingest(mut self, ingest: IngestConfig) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn with_window(mut self, window: WindowSize) -> Self {
        self.window = window;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Run one dialog. `Ok(None)` means it was stopped before replying.
    fn run(
        &self,
        message: &HostMessage,
        stop: &StopSignal,
    ) -> Result<Option<DialogReply>, PresenterError> {
        debug!(
            program = %self.program.display(),
            args = ?self.args,
            "Spawning dialog process"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                PresenterError::Startup(format!("{}: {}", self.program.display(), e))
            })?;

        let (Some(mut stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            self.reap(&mut child);
            return Err(PresenterError::Startup(
                "dialog pipes were not captured".to_string(),
            ));
        };

        if let Err(e) = protocol::send(&mut stdin, message) {
            // The child may already have died; its exit status says more
            warn!(error = %e, "Could not send request to dialog");
        }

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("dialog-reply-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let reply = protocol::decode::<DialogReply>(&line).map_err(|e| e.to_string());
                    if tx.send(reply).is_err() {
                        break;
                    }
                }
            })?;

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(reply)) => {
                    drop(stdin);
                    self.reap(&mut child);
                    return Ok(Some(reply));
                }
                Ok(Err(e)) => {
                    self.shutdown(&mut child, stdin);
                    return Err(PresenterError::Protocol(format!(
                        "unreadable reply from dialog: {}",
                        e
                    )));
                }
                Err(RecvTimeoutError::Timeout) => {
                    if stop.is_triggered() {
                        debug!("Stopping dialog process");
                        self.shutdown(&mut child, stdin);
                        return Ok(None);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    drop(stdin);
                    let status = child.wait()?;
                    return Err(PresenterError::Startup(format!(
                        "dialog exited without replying ({})",
                        describe(status)
                    )));
                }
            }
        }
    }

    /// Ask the dialog to close, then kill it if it overstays the grace period
    fn shutdown(&self, child: &mut Child, mut stdin: ChildStdin) {
        if let Err(e) = protocol::send(&mut stdin, &HostMessage::Stop) {
            debug!(error = %e, "Dialog input already closed");
        }
        drop(stdin);
        self.reap(child);
    }

    fn reap(&self, child: &mut Child) {
        match child.wait_timeout(self.grace) {
            Ok(Some(status)) => debug!(status = %describe(status), "Dialog process exited"),
            Ok(None) => {
                warn!(
                    grace_secs = self.grace.as_secs_f64(),
                    "Dialog did not exit in time, killing it"
                );
                if let Err(e) = child.kill() {
                    warn!(error = %e, "Failed to kill dialog process");
                }
                if let Err(e) = child.wait() {
                    debug!(error = %e, "Failed to reap killed dialog process");
                }
            }
            Err(e) => warn!(error = %e, "Failed to wait for dialog process"),
        }
    }
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => status.to_string(),
    }
}

impl Presenter for ProcessPresenter {
    fn name(&self) -> &str {
        "process"
    }

    fn present(
        &self,
        request: &FeedbackRequest,
        stop: &StopSignal,
    ) -> Result<FeedbackOutcome, PresenterError> {
        let spec = DialogSpec {
            work_summary: request.work_summary.clone(),
            timeout_secs: request.timeout.map(|t| t.as_secs()),
            limits: self.limits,
            ingest: self.ingest.clone(),
            window: self.window,
        };
        match self.run(&HostMessage::Feedback(spec), stop)? {
            Some(reply) => reply.into_feedback_outcome(),
            None => Ok(FeedbackOutcome::cancelled(CancelReason::Stopped)),
        }
    }

    fn pick_image(&self, stop: &StopSignal) -> Result<PickOutcome, PresenterError> {
        let spec = PickSpec {
            ingest: self.ingest.clone(),
        };
        match self.run(&HostMessage::PickImage(spec), stop)? {
            Some(reply) => reply.into_pick_outcome(),
            None => Ok(PickOutcome::Cancelled {
                reason: CancelReason::Stopped,
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn shell(script: &str) -> ProcessPresenter {
        ProcessPresenter::new("sh", vec!["-c".to_string(), script.to_string()])
            .with_grace(Duration::from_millis(300))
    }

    fn reply_script(reply: &DialogReply) -> String {
        format!("read _; echo '{}'", serde_json::to_string(reply).unwrap())
    }

    #[test]
    fn test_reply_is_returned() {
        let presenter = shell(&reply_script(&DialogReply::Outcome {
            outcome: FeedbackOutcome::submitted(Some("ship it".to_string()), vec![]),
        }));

        let outcome = presenter
            .present(&FeedbackRequest::new("Summary"), &StopSignal::new())
            .unwrap();
        match outcome {
            FeedbackOutcome::Submitted { text, images, .. } => {
                assert_eq!(text.as_deref(), Some("ship it"));
                assert!(images.is_empty());
            }
            other => panic!("Expected Submitted, got {:?}", other),
        }
    }

    #[test]
    fn test_request_reaches_child() {
        // Only replies if the request line carries the summary
        let script = r#"read line; case "$line" in *'"type":"feedback"'*'Refactored parser'*) echo '{"type":"outcome","outcome":{"status":"cancelled","reason":{"kind":"user_cancelled"}}}';; *) exit 7;; esac"#;
        let outcome = shell(script)
            .present(&FeedbackRequest::new("Refactored parser"), &StopSignal::new())
            .unwrap();
        assert_eq!(outcome, FeedbackOutcome::cancelled(CancelReason::UserCancelled));
    }

    #[test]
    fn test_pick_reply() {
        let presenter = shell(&reply_script(&DialogReply::PickCancelled {
            reason: CancelReason::WindowClosed,
        }));
        let outcome = presenter.pick_image(&StopSignal::new()).unwrap();
        assert_eq!(
            outcome,
            PickOutcome::Cancelled {
                reason: CancelReason::WindowClosed
            }
        );
    }

    #[test]
    fn test_failed_reply_is_startup_error() {
        let presenter = shell(&reply_script(&DialogReply::Failed {
            message: "no display".to_string(),
        }));
        let err = presenter
            .present(&FeedbackRequest::new("x"), &StopSignal::new())
            .unwrap_err();
        assert!(matches!(err, PresenterError::Startup(ref m) if m == "no display"));
    }

    #[test]
    fn test_exit_without_reply() {
        let err = shell("read _; exit 3")
            .present(&FeedbackRequest::new("x"), &StopSignal::new())
            .unwrap_err();
        match err {
            PresenterError::Startup(message) => assert!(message.contains("exit code 3")),
            other => panic!("Expected Startup, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_reply_is_protocol_error() {
        let err = shell("read _; echo 'not json'; sleep 5")
            .present(&FeedbackRequest::new("x"), &StopSignal::new())
            .unwrap_err();
        assert!(matches!(err, PresenterError::Protocol(_)));
    }

    #[test]
    fn test_stop_kills_unresponsive_dialog() {
        let presenter = shell("read _; exec sleep 30");
        let stop = StopSignal::new();
        let trigger = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            trigger.trigger();
        });

        let start = Instant::now();
        let outcome = presenter.present(&FeedbackRequest::new("x"), &stop).unwrap();
        assert_eq!(outcome, FeedbackOutcome::cancelled(CancelReason::Stopped));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_killed_dialog_is_reaped() {
        let dir = tempfile::TempDir::new().unwrap();
        let pid_file = dir.path().join("dialog.pid");
        let presenter = shell(&format!(
            "echo $$ > '{}'; read _; exec sleep 30",
            pid_file.display()
        ));
        let stop = StopSignal::new();
        stop.trigger();

        let outcome = presenter.present(&FeedbackRequest::new("x"), &stop).unwrap();
        assert_eq!(outcome, FeedbackOutcome::cancelled(CancelReason::Stopped));

        // A zombie keeps its /proc entry until it has been waited on
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let proc_entry = PathBuf::from("/proc").join(pid.trim());
        assert!(!proc_entry.exists(), "dialog process {} was not reaped", pid.trim());
    }

    #[test]
    fn test_missing_program_is_startup_error() {
        let presenter = ProcessPresenter::new("/nonexistent/feedback-dialog", vec![]);
        let err = presenter
            .present(&FeedbackRequest::new("x"), &StopSignal::new())
            .unwrap_err();
        assert!(matches!(err, PresenterError::Startup(_)));
    }
}
