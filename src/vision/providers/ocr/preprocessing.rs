// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor preparation for the text detection and recognition models

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Square input size of the detection model
pub const DET_INPUT_SIZE: u32 = 640;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum recognition input width
pub const REC_MAX_WIDTH: u32 = 320;

/// ImageNet channel means
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

const PAD_GRAY: Rgb<u8> = Rgb([128, 128, 128]);

/// Convert an RGB buffer to a normalized NCHW tensor
pub fn to_normalized_tensor(rgb: &RgbImage) -> Array4<f32> {
    let (w, h) = rgb.dimensions();
    Array4::from_shape_fn((1, 3, h as usize, w as usize), |(_, c, y, x)| {
        let value = rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
        (value - MEAN[c]) / STD[c]
    })
}

/// Letterbox the image into the detection input and normalize it
pub fn preprocess_for_detection(image: &DynamicImage) -> (Array4<f32>, PreprocessInfo) {
    let info = PreprocessInfo::new(image, DET_INPUT_SIZE);
    let padded = resize_with_padding(image, &info, DET_INPUT_SIZE);
    (to_normalized_tensor(&padded), info)
}

/// Resize a cropped text line to the recognition height, keeping aspect ratio
pub fn preprocess_for_recognition(crop: &DynamicImage) -> Array4<f32> {
    let (w, h) = crop.dimensions();
    let scale = REC_INPUT_HEIGHT as f32 / h.max(1) as f32;
    let width = ((w as f32 * scale).round() as u32).clamp(4, REC_MAX_WIDTH);

    let resized = crop.resize_exact(width, REC_INPUT_HEIGHT, FilterType::Triangle);
    to_normalized_tensor(&resized.to_rgb8())
}

/// Scale the image to fit `target` x `target` and center it on gray padding
pub fn resize_with_padding(image: &DynamicImage, info: &PreprocessInfo, target: u32) -> RgbImage {
    let mut output = RgbImage::from_pixel(target, target, PAD_GRAY);
    if info.original_width == 0 || info.original_height == 0 {
        return output;
    }

    let resized = image
        .resize_exact(info.scaled_width, info.scaled_height, FilterType::Triangle)
        .to_rgb8();
    image::imageops::replace(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );
    output
}

/// Letterbox geometry, used to map model-space boxes back to the source image
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessInfo {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl PreprocessInfo {
    pub fn new(image: &DynamicImage, target: u32) -> Self {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                scaled_width: 0,
                scaled_height: 0,
                original_width: w,
                original_height: h,
            };
        }

        let scale = (target as f32 / w as f32).min(target as f32 / h as f32);
        let scaled_width = ((w as f32 * scale).round() as u32).clamp(1, target);
        let scaled_height = ((h as f32 * scale).round() as u32).clamp(1, target);

        Self {
            scale,
            offset_x: (target - scaled_width) / 2,
            offset_y: (target - scaled_height) / 2,
            scaled_width,
            scaled_height,
            original_width: w,
            original_height: h,
        }
    }

    /// Map a model-space point to source pixel coordinates
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.offset_x as f32) / self.scale,
            (y - self.offset_y as f32) / self.scale,
        )
    }
}
