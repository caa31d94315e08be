// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding for analysis requests

use image::{ColorType, DynamicImage, ImageFormat};
use thiserror::Error;

/// Default maximum accepted image size (10MB)
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Input errors raised while turning request bytes into pixels
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Image has zero width or height")]
    EmptyDimensions,
}

/// Image information extracted during decoding
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected container format
    pub format: ImageFormat,
    /// Pixel layout of the decoded buffer
    pub color_type: ColorType,
    /// Size of the encoded input in bytes
    pub size_bytes: usize,
}

impl ImageInfo {
    /// Short format tag, e.g. "png"
    pub fn format_tag(&self) -> &'static str {
        format_to_extension(self.format)
    }

    /// Color space tag for the response, if the layout has a common name
    pub fn color_space(&self) -> Option<&'static str> {
        color_space_name(self.color_type)
    }
}

/// A decoded, immutable pixel buffer shared read-only by every provider
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: DynamicImage,
    pub info: ImageInfo,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Wrap an in-memory image (for providers and tests that skip decoding)
    pub fn from_pixels(pixels: DynamicImage, format: ImageFormat) -> Self {
        let info = ImageInfo {
            width: pixels.width(),
            height: pixels.height(),
            format,
            color_type: pixels.color(),
            size_bytes: 0,
        };
        Self { pixels, info }
    }
}

/// Decode raw image bytes
///
/// # Arguments
/// * `bytes` - Raw image bytes as received in the request body
/// * `max_size` - Upper bound on `bytes.len()`
///
/// # Returns
/// * `Ok(DecodedImage)` - The decoded pixels and metadata
/// * `Err(ImageError)` - If the bytes are empty, oversized, or not an image
pub fn decode_image_bytes(bytes: &[u8], max_size: usize) -> Result<DecodedImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    if bytes.len() > max_size {
        return Err(ImageError::TooLarge(bytes.len(), max_size));
    }

    // Detect format from magic bytes
    let format = detect_format(bytes)?;

    let pixels = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(ImageError::EmptyDimensions);
    }

    let info = ImageInfo {
        width: pixels.width(),
        height: pixels.height(),
        format,
        color_type: pixels.color(),
        size_bytes: bytes.len(),
    };

    Ok(DecodedImage { pixels, info })
}

/// Detect image format from magic bytes
///
/// # Arguments
/// * `bytes` - Raw image data
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(ImageError::UnsupportedFormat)` - If format cannot be detected
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Get the format extension as a string
pub fn format_to_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        _ => "unknown",
    }
}

fn color_space_name(color: ColorType) -> Option<&'static str> {
    match color {
        ColorType::L8 | ColorType::L16 => Some("gray"),
        ColorType::La8 | ColorType::La16 => Some("grayAlpha"),
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => Some("rgb"),
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => Some("rgba"),
        _ => None,
    }
}
