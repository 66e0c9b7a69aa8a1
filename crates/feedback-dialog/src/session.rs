//! State of one open feedback dialog.
//!
//! The session owns the text buffer and the staged images. It never talks
//! to the host; closing it yields the round's outcome exactly once.

use std::path::Path;

use feedback_core::{CancelReason, FeedbackOutcome, Limits};
use feedback_images::{CapturedImage, ImageError, ImageLoader, Thumbnail};
use tracing::debug;

/// Lifecycle of the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Rendering,
    Editing,
    ImageOp,
    Closing,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// One-line message shown above the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// An empty clipboard is not a failure
    pub fn for_image_error(error: &ImageError) -> Self {
        match error {
            ImageError::ClipboardEmpty => Self::info("No image found on the clipboard"),
            other => Self::error(other.to_string()),
        }
    }
}

/// An image waiting to be submitted, with its preview
#[derive(Debug, Clone)]
pub struct StagedImage {
    /// Stable for the life of the session; used to key preview textures
    pub id: u64,
    pub image: CapturedImage,
    pub thumbnail: Thumbnail,
}

pub struct Session {
    text: String,
    images: Vec<StagedImage>,
    next_id: u64,
    limits: Limits,
    loader: ImageLoader,
    notice: Option<Notice>,
    phase: Phase,
}

impl Session {
    pub fn new(limits: Limits, loader: ImageLoader) -> Self {
        Self {
            text: String::new(),
            images: Vec::new(),
            next_id: 0,
            limits,
            loader,
            notice: None,
            phase: Phase::Created,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Buffer for the text field. Call [`Session::text_changed`] after edits.
    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn images(&self) -> &[StagedImage] {
        &self.images
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closing | Phase::Terminated)
    }

    /// First frame has been drawn
    pub fn rendered(&mut self) {
        if self.phase == Phase::Created {
            self.phase = Phase::Rendering;
        }
    }

    pub fn text_changed(&mut self) {
        if self.is_closed() {
            return;
        }
        self.phase = Phase::Editing;
        if matches!(self.notice, Some(Notice { level: NoticeLevel::Warning, .. })) {
            self.notice = None;
        }
    }

    /// Load and stage a file. Returns whether it was added.
    pub fn add_path(&mut self, path: &Path) -> bool {
        if !self.begin_image_op() {
            return false;
        }
        let result = self.loader.load_from_path(path);
        self.stage(result)
    }

    /// Stage files in order, stopping at the image limit
    pub fn add_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> usize {
        let mut added = 0;
        for path in paths {
            if self.add_path(path.as_ref()) {
                added += 1;
            } else if self.images.len() >= self.limits.max_images {
                break;
            }
        }
        added
    }

    pub fn add_from_clipboard(&mut self) -> bool {
        if !self.begin_image_op() {
            return false;
        }
        let result = self.loader.load_from_clipboard();
        self.stage(result)
    }

    /// Stage an already-loaded image
    pub fn add_image(&mut self, image: CapturedImage) -> bool {
        if !self.begin_image_op() {
            return false;
        }
        self.stage(Ok(image))
    }

    pub fn remove(&mut self, id: u64) -> bool {
        if self.is_closed() {
            return false;
        }
        let before = self.images.len();
        self.images.retain(|staged| staged.id != id);
        if self.images.len() == before {
            return false;
        }
        self.phase = Phase::ImageOp;
        self.notice = None;
        true
    }

    pub fn clear_images(&mut self) {
        if self.is_closed() {
            return;
        }
        self.images.clear();
        self.phase = Phase::ImageOp;
        self.notice = None;
    }

    /// Validate and close with the submission.
    ///
    /// On a validation failure a warning is shown and the session stays
    /// open for correction.
    pub fn submit(&mut self) -> Option<FeedbackOutcome> {
        if self.is_closed() {
            return None;
        }
        if let Err(e) = self.limits.validate(Some(&self.text), self.images.len()) {
            self.notice = Some(Notice::warning(e.to_string()));
            self.phase = Phase::Editing;
            return None;
        }

        let text = std::mem::take(&mut self.text);
        let images = self.images.drain(..).map(|staged| staged.image).collect();
        self.phase = Phase::Closing;
        Some(FeedbackOutcome::submitted(Some(text), images))
    }

    /// Close without a submission, discarding any partial input.
    ///
    /// Returns `None` if the session already closed.
    pub fn cancel(&mut self, reason: CancelReason) -> Option<FeedbackOutcome> {
        if self.is_closed() {
            return None;
        }
        self.text.clear();
        self.images.clear();
        self.phase = Phase::Closing;
        Some(FeedbackOutcome::cancelled(reason))
    }

    /// The event loop has exited
    pub fn terminate(&mut self) {
        self.phase = Phase::Terminated;
    }

    fn begin_image_op(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        if let Err(e) = self.limits.check_add_image(self.images.len()) {
            debug!(error = %e, "Image limit reached");
            self.notice = Some(Notice::warning(format!(
                "Maximum of {} images reached",
                self.limits.max_images
            )));
            return false;
        }
        self.phase = Phase::ImageOp;
        true
    }

    fn stage(&mut self, result: Result<CapturedImage, ImageError>) -> bool {
        let config = self.loader.config();
        let (max_width, max_height) = (config.thumbnail_width, config.thumbnail_height);
        let staged = result.and_then(|image| {
            let thumbnail = image.thumbnail(max_width, max_height)?;
            Ok((image, thumbnail))
        });

        match staged {
            Ok((image, thumbnail)) => {
                debug!(source = %image.source, size = image.byte_len(), "Image staged");
                self.notice = Some(Notice::info(format!(
                    "Added {} ({})",
                    image.source_label(),
                    image.dimensions_label()
                )));
                self.images.push(StagedImage {
                    id: self.next_id,
                    image,
                    thumbnail,
                });
                self.next_id += 1;
                true
            }
            Err(e) => {
                debug!(error = %e, "Image not added");
                self.notice = Some(Notice::for_image_error(&e));
                false
            }
        }
    }
}
