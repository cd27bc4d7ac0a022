//! Bounded re-encoding of uploaded images.
//!
//! Raster input is decoded, shrunk to fit the configured bounding box and
//! written back out as JPEG. Re-encoding from pixels drops EXIF, ICC and XMP
//! payloads. Vector input is passed through untouched.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader, Rgb, RgbImage};
use serde::Deserialize;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("image processing failed: {0}")]
    Processing(String),
}

/// Transcoder settings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TranscodeOptions {
    /// Maximum output width in pixels. Default: 800.
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,
    /// Maximum output height in pixels. Default: 800.
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,
    /// JPEG quality, 0-100. Values outside 1-100 are clamped. Default: 85.
    #[serde(default = "default_quality")]
    pub quality: u8,
}

fn default_max_dimension() -> u32 {
    800
}
fn default_quality() -> u8 {
    85
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            quality: default_quality(),
        }
    }
}

/// Output of a transcode call.
#[derive(Debug, Clone)]
pub struct Transcoded {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Output dimensions. `None` for vector pass-through.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Transcode an image buffer according to `opts`.
///
/// The declared content type only decides between pass-through (SVG) and
/// raster decoding; the raster format itself is guessed from the bytes.
pub fn transcode(
    input: &[u8],
    content_type: &str,
    opts: &TranscodeOptions,
) -> Result<Transcoded, TranscodeError> {
    if is_vector(content_type) {
        return Ok(Transcoded {
            bytes: input.to_vec(),
            content_type: SVG_CONTENT_TYPE.to_string(),
            width: None,
            height: None,
        });
    }

    let img = decode(input)?;
    let (width, height) = img.dimensions();
    let (target_w, target_h) = fit_within(width, height, opts.max_width, opts.max_height);

    let img = if (target_w, target_h) == (width, height) {
        img
    } else {
        img.resize_exact(target_w, target_h, FilterType::Lanczos3)
    };

    let rgb = flatten_to_rgb(img);
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, opts.quality.clamp(1, 100));
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(encoder)
        .map_err(|e| TranscodeError::Processing(e.to_string()))?;

    Ok(Transcoded {
        bytes,
        content_type: OUTPUT_CONTENT_TYPE.to_string(),
        width: Some(target_w),
        height: Some(target_h),
    })
}

/// File extension matching a transcoder output content type.
pub fn normalized_extension(content_type: &str) -> &'static str {
    if is_vector(content_type) {
        "svg"
    } else {
        "jpg"
    }
}

fn is_vector(content_type: &str) -> bool {
    content_type.eq_ignore_ascii_case(SVG_CONTENT_TYPE)
}

fn decode(input: &[u8]) -> Result<DynamicImage, TranscodeError> {
    ImageReader::new(Cursor::new(input))
        .with_guessed_format()
        .map_err(|e| TranscodeError::UnsupportedFormat(e.to_string()))?
        .decode()
        .map_err(|e| TranscodeError::UnsupportedFormat(e.to_string()))
}

/// Compute the largest size that fits inside `max_w × max_h` without
/// upscaling. The limiting edge lands exactly on its bound.
fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let max_w = max_w.max(1);
    let max_h = max_h.max(1);
    if width <= max_w && height <= max_h {
        return (width, height);
    }

    let (w, h) = (width as u64, height as u64);
    // Compare w/max_w against h/max_h without floating point.
    if w * max_h as u64 >= h * max_w as u64 {
        let scaled_h = (h * max_w as u64 + w / 2) / w;
        (max_w, (scaled_h as u32).clamp(1, max_h))
    } else {
        let scaled_w = (w * max_h as u64 + h / 2) / h;
        ((scaled_w as u32).clamp(1, max_w), max_h)
    }
}

/// Composite transparent pixels over white. JPEG has no alpha channel.
fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }

    let rgba = img.into_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
