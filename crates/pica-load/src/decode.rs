//! Decode Glue
//!
//! Turns encoded bytes into pool-backed pixel buffers. Formats are sniffed
//! from magic bytes; decoding itself goes through the image crate. The pool
//! is always consulted before allocating a fresh buffer.

use std::io::Cursor;
use std::sync::Arc;

use image::GenericImageView;

use pica_memory::{Bitmap, BitmapPool, PixelFormat};

/// Encoded formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Unknown,
}

impl EncodedFormat {
    /// Detect format from magic bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        if data.len() < 8 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // GIF: GIF87a or GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }

    /// Get format from a file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "webp" => Self::WebP,
            _ => Self::Unknown,
        }
    }

    fn to_image_format(self) -> Option<image::ImageFormat> {
        match self {
            Self::Png => Some(image::ImageFormat::Png),
            Self::Jpeg => Some(image::ImageFormat::Jpeg),
            Self::Gif => Some(image::ImageFormat::Gif),
            Self::WebP => Some(image::ImageFormat::WebP),
            Self::Unknown => None,
        }
    }
}

/// Decode options.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Allow shrinking to the requested size
    pub allow_downsample: bool,
    /// Format to assume when magic bytes are inconclusive
    pub format_hint: Option<EncodedFormat>,
}

/// A decoded result and whether it was shrunk to fit the target size.
#[derive(Debug)]
pub struct Decoded {
    pub bitmap: Bitmap,
    pub downsampled: bool,
}

/// Decode failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("decode failed: {0}")]
    DecodeFailed(String),

    #[error("image has zero width or height")]
    ZeroDimension,
}

/// Decode `data` into a pool-backed RGBA buffer.
///
/// With `allow_downsample` set and a `target_size` smaller than the intrinsic
/// dimensions, the image is shrunk to fit (aspect preserved). The returned
/// bitmap starts untracked; the caller registers it with the reference
/// counter through a delegate lifecycle call.
pub fn decode(
    pool: &BitmapPool,
    data: &[u8],
    target_size: Option<(u32, u32)>,
    options: &DecodeOptions,
) -> Result<Decoded, DecodeError> {
    let format = match EncodedFormat::from_bytes(data) {
        EncodedFormat::Unknown => options.format_hint.unwrap_or(EncodedFormat::Unknown),
        sniffed => sniffed,
    };
    let img_format = format.to_image_format().ok_or(DecodeError::UnsupportedFormat)?;

    let img = image::load(Cursor::new(data), img_format)
        .map_err(|e| DecodeError::DecodeFailed(e.to_string()))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::ZeroDimension);
    }

    let (img, downsampled) = match target_size {
        Some((tw, th)) if options.allow_downsample && (width > tw || height > th) => {
            (img.resize(tw, th, image::imageops::FilterType::Triangle), true)
        }
        _ => (img, false),
    };

    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut buffer = pool.get_or_alloc(width, height, PixelFormat::Rgba8888);
    buffer.copy_from_tight(rgba.as_raw());
    tracing::trace!(?format, width, height, downsampled, "decoded image");

    Ok(Decoded {
        bitmap: Arc::new(buffer),
        downsampled,
    })
}
