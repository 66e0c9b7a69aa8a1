//! # feedback-dialog
//!
//! The desktop side of a feedback round: the feedback window, the image
//! picker window, and the JSON-lines protocol that lets a host process
//! drive them.
//!
//! A window toolkit event loop can only run once per process, so each
//! dialog runs in its own child process. [`run_child`] is that process's
//! entry point: it reads the request from stdin, shows the window, and
//! writes exactly one [`DialogReply`] to stdout.

pub mod app;
pub mod markdown;
pub mod picker;
pub mod protocol;
pub mod session;

pub use app::{FeedbackApp, FEEDBACK_TITLE};
pub use picker::{ImagePickerApp, PickerSession, PICKER_TITLE};
pub use protocol::{DialogReply, DialogSpec, HostMessage, PickSpec, WindowSize};
pub use session::{Notice, NoticeLevel, Phase, Session, StagedImage};

use std::io::{self, BufRead, Write};
use std::thread;

use eframe::egui;
use feedback_core::{delivery_slot, CancelReason, FeedbackOutcome, StopSignal};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DialogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid request: {0}")]
    Protocol(String),

    #[error("Could not open window: {0}")]
    Window(String),
}

/// Serve one dialog request read from `input`, replying on `output`.
///
/// Lines after the request are watched for a stop message; end of input
/// counts as a stop since it means the host is gone.
pub fn run_child<R, W>(mut input: R, mut output: W) -> Result<(), DialogError>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(DialogError::Protocol(
            "input closed before a request was sent".to_string(),
        ));
    }
    let request: HostMessage =
        protocol::decode(&line).map_err(|e| DialogError::Protocol(e.to_string()))?;

    let stop = StopSignal::new();
    let (slot, rx) = delivery_slot();

    let (result, fallback) = match request {
        HostMessage::Feedback(spec) => (
            app::run(spec, input, stop, slot.clone()),
            DialogReply::Outcome {
                outcome: FeedbackOutcome::cancelled(CancelReason::WindowClosed),
            },
        ),
        HostMessage::PickImage(spec) => (
            picker::run(spec, input, stop, slot.clone()),
            DialogReply::PickCancelled {
                reason: CancelReason::WindowClosed,
            },
        ),
        HostMessage::Stop => (
            Ok(()),
            DialogReply::Outcome {
                outcome: FeedbackOutcome::cancelled(CancelReason::Stopped),
            },
        ),
    };

    if let Err(e) = result {
        warn!(error = %e, "Dialog failed");
        slot.deliver(DialogReply::Failed {
            message: e.to_string(),
        });
    }

    let reply = rx.try_recv().unwrap_or(fallback);
    protocol::send(&mut output, &reply)?;
    Ok(())
}

/// Watch the rest of the host's input for a stop request
pub(crate) fn watch_host<R>(input: R, stop: StopSignal, ctx: egui::Context)
where
    R: BufRead + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name("dialog-host-watch".to_string())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match protocol::decode::<HostMessage>(&line) {
                    Ok(HostMessage::Stop) => break,
                    Ok(other) => debug!(?other, "Ignoring unexpected host message"),
                    Err(e) => warn!(error = %e, "Ignoring malformed host message"),
                }
            }
            debug!("Host asked the dialog to close");
            stop.trigger();
            ctx.request_repaint();
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Could not watch host input; stop requests will be missed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_stop_before_show_replies_stopped() {
        let mut output = Vec::new();
        run_child(Cursor::new(b"{\"type\":\"stop\"}\n".to_vec()), &mut output).unwrap();

        let reply: DialogReply = protocol::decode(std::str::from_utf8(&output).unwrap()).unwrap();
        assert_eq!(
            reply.into_feedback_outcome().unwrap(),
            FeedbackOutcome::cancelled(CancelReason::Stopped)
        );
    }

    #[test]
    fn test_empty_input_is_protocol_error() {
        let mut output = Vec::new();
        let result = run_child(Cursor::new(Vec::new()), &mut output);
        assert!(matches!(result, Err(DialogError::Protocol(_))));
        assert!(output.is_empty());
    }

    #[test]
    fn test_garbage_request_is_protocol_error() {
        let mut output = Vec::new();
        let result = run_child(Cursor::new(b"hello\n".to_vec()), &mut output);
        assert!(matches!(result, Err(DialogError::Protocol(_))));
    }
}
