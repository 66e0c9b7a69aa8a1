//! # feedback-images
//!
//! Image ingestion for feedback rounds.
//!
//! Every image a user attaches, whether picked from disk or pasted from the
//! clipboard, passes through [`ImageLoader`]: size check, format allow-list,
//! decode, and re-encode to PNG. The result is a [`CapturedImage`].
//!
//! ## Key Types
//!
//! - [`ImageLoader`] - Validating loader configured by [`IngestConfig`]
//! - [`CapturedImage`] - Normalized PNG bytes plus source and dimensions
//! - [`Thumbnail`] - Bounded preview pixels for the dialog
//! - [`ImageInfo`] - File metadata report used by `get_image_info`

mod captured;
mod clipboard;
mod error;
mod info;
mod loader;
mod thumbnail;

pub use captured::{CapturedImage, ImageSource};
pub use error::ImageError;
pub use info::{color_mode, ImageInfo};
pub use loader::{format_name, normalize, ImageLoader, IngestConfig, DEFAULT_MAX_IMAGE_BYTES};
pub use thumbnail::{fit_within, Thumbnail};
