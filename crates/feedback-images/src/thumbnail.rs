use image::imageops::FilterType;

use crate::{CapturedImage, ImageError};

/// RGBA preview pixels for display; never returned to the caller
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Aspect-preserving fit inside `max_width` x `max_height`. Never upscales.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let fitted_width = ((width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
    let fitted_height = ((height as f64 * scale).round() as u32).clamp(1, max_height.max(1));
    (fitted_width, fitted_height)
}

impl CapturedImage {
    /// Decode the PNG and scale it into the preview box
    pub fn thumbnail(&self, max_width: u32, max_height: u32) -> Result<Thumbnail, ImageError> {
        let decoded = image::load_from_memory_with_format(&self.png, image::ImageFormat::Png)
            .map_err(|e| ImageError::DecodeError(e.to_string()))?
            .to_rgba8();

        let (width, height) = fit_within(decoded.width(), decoded.height(), max_width, max_height);
        let scaled = if (width, height) == decoded.dimensions() {
            decoded
        } else {
            image::imageops::resize(&decoded, width, height, FilterType::Lanczos3)
        };

        Ok(Thumbnail {
            width,
            height,
            rgba: scaled.into_raw(),
        })
    }
}
