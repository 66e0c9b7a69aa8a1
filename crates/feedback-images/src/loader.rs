use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{CapturedImage, ImageError, ImageSource};

/// Default upper bound for a single image file (10 MiB)
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Settings that govern ingestion, read once at round start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum accepted size of the source file or encoded bytes
    pub max_bytes: u64,
    /// Allow-listed formats by extension name (`png`, `jpeg`, `gif`, `bmp`, `webp`)
    pub formats: Vec<String>,
    /// Bounding box for UI previews
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            formats: ["png", "jpeg", "gif", "bmp", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            thumbnail_width: 100,
            thumbnail_height: 80,
        }
    }
}

/// Loads images from files and the clipboard into normalized PNG records
#[derive(Debug, Clone, Default)]
pub struct ImageLoader {
    config: IngestConfig,
}

impl ImageLoader {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// File extensions accepted by the allow-list, for file pickers
    pub fn extensions(&self) -> Vec<&'static str> {
        let mut extensions = Vec::new();
        for name in &self.config.formats {
            if let Some(format) = ImageFormat::from_extension(name) {
                for ext in format.extensions_str() {
                    if !extensions.contains(ext) {
                        extensions.push(*ext);
                    }
                }
            }
        }
        extensions
    }

    /// Load, validate and normalize an image file
    pub fn load_from_path(&self, path: &Path) -> Result<CapturedImage, ImageError> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(ImageError::FileNotFound(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ImageError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.len() > self.config.max_bytes {
            return Err(ImageError::TooLarge {
                size: metadata.len(),
                max: self.config.max_bytes,
            });
        }

        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.load_from_bytes(&bytes, ImageSource::File { name })
    }

    /// Validate and normalize an encoded image held in memory
    pub fn load_from_bytes(
        &self,
        bytes: &[u8],
        source: ImageSource,
    ) -> Result<CapturedImage, ImageError> {
        let size = bytes.len() as u64;
        if size > self.config.max_bytes {
            return Err(ImageError::TooLarge {
                size,
                max: self.config.max_bytes,
            });
        }

        let format = image::guess_format(bytes)
            .map_err(|_| ImageError::UnsupportedFormat("unrecognized data".to_string()))?;
        if !self.is_allowed(format) {
            return Err(ImageError::UnsupportedFormat(format_name(format)));
        }

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ImageError::DecodeError(e.to_string()))?;

        self.capture(decoded, source)
    }

    /// Normalize raw RGBA pixels (as delivered by the clipboard)
    pub(crate) fn load_from_rgba(
        &self,
        width: usize,
        height: usize,
        rgba: Vec<u8>,
        source: ImageSource,
    ) -> Result<CapturedImage, ImageError> {
        let (width, height) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(ImageError::DecodeError(format!(
                    "image dimensions {}x{} are out of range",
                    width, height
                )))
            }
        };

        let buffer = image::RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            ImageError::DecodeError(format!(
                "pixel buffer does not match {}x{} RGBA",
                width, height
            ))
        })?;

        self.capture(DynamicImage::ImageRgba8(buffer), source)
    }

    fn capture(
        &self,
        image: DynamicImage,
        source: ImageSource,
    ) -> Result<CapturedImage, ImageError> {
        // The size limit applies to the source bytes; PNG output may be larger
        let png = normalize(&image)?;

        debug!(
            source = %source,
            width = image.width(),
            height = image.height(),
            png_bytes = png.len(),
            "Captured image"
        );

        Ok(CapturedImage {
            png,
            source,
            width: image.width(),
            height: image.height(),
        })
    }

    fn is_allowed(&self, format: ImageFormat) -> bool {
        self.config.formats.iter().any(|name| {
            match ImageFormat::from_extension(name) {
                Some(allowed) => allowed == format,
                None => {
                    warn!(format = %name, "Ignoring unknown format in allow-list");
                    false
                }
            }
        })
    }
}

/// Re-encode as PNG, keeping alpha only when the source has it
pub fn normalize(image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let canonical = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    let mut out = Cursor::new(Vec::new());
    canonical
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// Upper-case display name for a format (`PNG`, `JPEG`, ...)
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}
