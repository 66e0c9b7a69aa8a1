use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning a file or the clipboard into a [`CapturedImage`].
///
/// [`CapturedImage`]: crate::CapturedImage
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Image is too large ({size} bytes, limit is {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("The clipboard does not contain an image")]
    ClipboardEmpty,

    #[error("Clipboard is unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("Failed to encode image as PNG: {0}")]
    Encode(String),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageError {
    /// Whether this is a normal "nothing there" result rather than a failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::ClipboardEmpty)
    }
}
