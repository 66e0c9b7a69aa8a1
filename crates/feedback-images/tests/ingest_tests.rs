use std::fs;
use std::path::PathBuf;

use feedback_images::{ImageError, ImageInfo, ImageLoader, ImageSource, IngestConfig};
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tempfile::TempDir;

/// Helper: write a small opaque PNG and return its path.
fn write_rgb_png(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.path().join(name);
    RgbImage::from_pixel(width, height, Rgb([40, 120, 200]))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

fn write_rgba_png(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    RgbaImage::from_pixel(8, 6, Rgba([255, 0, 0, 64]))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

fn write_jpeg(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    RgbImage::from_pixel(32, 24, Rgb([10, 200, 30]))
        .save_with_format(&path, ImageFormat::Jpeg)
        .unwrap();
    path
}

// ============================================================
// load_from_path
// ============================================================

#[test]
fn test_load_png_from_path() {
    let dir = TempDir::new().unwrap();
    let path = write_rgb_png(&dir, "shot.png", 64, 48);

    let image = ImageLoader::default().load_from_path(&path).unwrap();

    assert_eq!(image.width, 64);
    assert_eq!(image.height, 48);
    assert_eq!(
        image.source,
        ImageSource::File {
            name: "shot.png".to_string()
        }
    );
    assert_eq!(image.source_label(), "file: shot.png");
    assert_eq!(image::guess_format(&image.png).unwrap(), ImageFormat::Png);
}

#[test]
fn test_jpeg_is_reencoded_as_opaque_png() {
    let dir = TempDir::new().unwrap();
    let path = write_jpeg(&dir, "photo.jpg");

    let image = ImageLoader::default().load_from_path(&path).unwrap();
    let decoded = image::load_from_memory(&image.png).unwrap();

    assert_eq!(image::guess_format(&image.png).unwrap(), ImageFormat::Png);
    assert_eq!(decoded.color(), image::ColorType::Rgb8);
    assert_eq!((decoded.width(), decoded.height()), (32, 24));
}

#[test]
fn test_transparency_is_preserved() {
    let dir = TempDir::new().unwrap();
    let path = write_rgba_png(&dir, "overlay.png");

    let image = ImageLoader::default().load_from_path(&path).unwrap();
    let decoded = image::load_from_memory(&image.png).unwrap();

    assert_eq!(decoded.color(), image::ColorType::Rgba8);
    assert_eq!(decoded.to_rgba8().get_pixel(0, 0)[3], 64);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.png");

    let result = ImageLoader::default().load_from_path(&path);
    assert!(matches!(result, Err(ImageError::FileNotFound(p)) if p == path));
}

#[test]
fn test_directory_is_not_an_image() {
    let dir = TempDir::new().unwrap();
    let result = ImageLoader::default().load_from_path(dir.path());
    assert!(matches!(result, Err(ImageError::FileNotFound(_))));
}

#[test]
fn test_file_over_size_limit() {
    let dir = TempDir::new().unwrap();
    let path = write_rgb_png(&dir, "big.png", 64, 64);
    let size = fs::metadata(&path).unwrap().len();

    let loader = ImageLoader::new(IngestConfig {
        max_bytes: size - 1,
        ..IngestConfig::default()
    });

    match loader.load_from_path(&path) {
        Err(ImageError::TooLarge { size: got, max }) => {
            assert_eq!(got, size);
            assert_eq!(max, size - 1);
        }
        other => panic!("expected TooLarge, got {:?}", other),
    }
}

#[test]
fn test_limit_applies_to_source_not_png() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noise.jpg");
    let mut state: u32 = 0x2545_f491;
    let noise = RgbImage::from_fn(256, 256, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        Rgb([next(), next(), next()])
    });
    noise.save_with_format(&path, ImageFormat::Jpeg).unwrap();
    let size = fs::metadata(&path).unwrap().len();

    let loader = ImageLoader::new(IngestConfig {
        max_bytes: size,
        ..IngestConfig::default()
    });
    let image = loader.load_from_path(&path).unwrap();

    assert!(image.png.len() as u64 > size);
    assert_eq!((image.width, image.height), (256, 256));
}

#[test]
fn test_unrecognized_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.png");
    fs::write(&path, "definitely not an image").unwrap();

    let result = ImageLoader::default().load_from_path(&path);
    assert!(matches!(result, Err(ImageError::UnsupportedFormat(_))));
}

#[test]
fn test_format_outside_allow_list() {
    let dir = TempDir::new().unwrap();
    let path = write_jpeg(&dir, "photo.jpg");

    let loader = ImageLoader::new(IngestConfig {
        formats: vec!["png".to_string()],
        ..IngestConfig::default()
    });

    match loader.load_from_path(&path) {
        Err(ImageError::UnsupportedFormat(name)) => assert_eq!(name, "JPEG"),
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
}

#[test]
fn test_truncated_png_is_decode_error() {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 16]);

    let result = ImageLoader::default().load_from_bytes(&bytes, ImageSource::Clipboard);
    assert!(matches!(result, Err(ImageError::DecodeError(_))));
}

// ============================================================
// Thumbnails
// ============================================================

#[test]
fn test_thumbnail_fits_box_and_keeps_full_image() {
    let dir = TempDir::new().unwrap();
    let path = write_rgb_png(&dir, "wide.png", 400, 100);

    let image = ImageLoader::default().load_from_path(&path).unwrap();
    let thumb = image.thumbnail(100, 80).unwrap();

    assert_eq!((thumb.width, thumb.height), (100, 25));
    assert_eq!(thumb.rgba.len(), (100 * 25 * 4) as usize);
    assert_eq!((image.width, image.height), (400, 100));
}

// ============================================================
// get_image_info
// ============================================================

#[test]
fn test_info_matches_loaded_dimensions() {
    let dir = TempDir::new().unwrap();
    let path = write_rgb_png(&dir, "roundtrip.png", 123, 45);

    let image = ImageLoader::default().load_from_path(&path).unwrap();
    let info = ImageInfo::from_path(&path).unwrap();

    assert_eq!((info.width, info.height), (image.width, image.height));
    assert_eq!(info.file_name, "roundtrip.png");
    assert_eq!(info.format, "PNG");
    assert_eq!(info.color_mode, "RGB");
    assert_eq!(info.file_size, fs::metadata(&path).unwrap().len());
}

#[test]
fn test_info_reports_jpeg() {
    let dir = TempDir::new().unwrap();
    let path = write_jpeg(&dir, "photo.jpg");

    let info = ImageInfo::from_path(&path).unwrap();
    let text = info.to_string();

    assert!(text.contains("Format: JPEG"));
    assert!(text.contains("Dimensions: 32 x 24"));
    assert!(text.contains("Color mode: RGB"));
}

#[test]
fn test_info_missing_file() {
    let result = ImageInfo::from_path(std::path::Path::new("/definitely/not/here.png"));
    assert!(matches!(result, Err(ImageError::FileNotFound(_))));
}
