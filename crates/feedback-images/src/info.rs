use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use image::{ColorType, ImageDecoder, ImageReader};

use crate::loader::format_name;
use crate::ImageError;

/// Header-level facts about an image file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub file_name: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub color_mode: String,
    pub file_size: u64,
}

impl ImageInfo {
    /// Inspect an image file without decoding its pixel data
    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(ImageError::FileNotFound(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ImageError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| ImageError::UnsupportedFormat("unrecognized data".to_string()))?;
        let decoder = reader
            .into_decoder()
            .map_err(|e| ImageError::DecodeError(e.to_string()))?;
        let (width, height) = decoder.dimensions();

        Ok(Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            format: format_name(format),
            width,
            height,
            color_mode: color_mode(decoder.color_type()).to_string(),
            file_size: metadata.len(),
        })
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File name: {}", self.file_name)?;
        writeln!(f, "Format: {}", self.format)?;
        writeln!(f, "Dimensions: {} x {}", self.width, self.height)?;
        writeln!(f, "Color mode: {}", self.color_mode)?;
        write!(f, "File size: {:.1} KB", self.file_size as f64 / 1024.0)
    }
}

/// PIL-style mode names, which is what assistants tend to expect
pub fn color_mode(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGB;32F",
        ColorType::Rgba32F => "RGBA;32F",
        _ => "unknown",
    }
}
