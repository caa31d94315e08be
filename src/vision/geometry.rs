// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Normalized geometry shared by every observation
//!
//! All coordinates are in [0, 1] relative to the source image, with the
//! origin at the bottom-left corner and y increasing upward. Providers whose
//! native output is in pixel space (top-left origin) convert with the
//! `from_pixel_*` helpers before handing observations to the orchestrator.

use serde::{Deserialize, Serialize};

/// A point in normalized image space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Convert a pixel coordinate (top-left origin) into normalized space
    pub fn from_pixel_top_left(x: f64, y: f64, image_width: u32, image_height: u32) -> Self {
        if image_width == 0 || image_height == 0 {
            return Self::new(0.0, 0.0);
        }
        let w = image_width as f64;
        let h = image_height as f64;
        Self::new(x / w, 1.0 - y / h)
    }
}

/// Axis-aligned rectangle in normalized image space
///
/// `(x, y)` is the bottom-left corner of the box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    /// Build a rectangle, clamping it so it stays inside the unit square
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let x = clamp_unit(x);
        let y = clamp_unit(y);
        Self {
            x,
            y,
            width: clamp_unit(width).min(1.0 - x),
            height: clamp_unit(height).min(1.0 - y),
        }
    }

    /// Convert a pixel box (top-left origin, y growing downward) into
    /// normalized bottom-left space
    pub fn from_pixel_top_left(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        if image_width == 0 || image_height == 0 {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }
        let w = image_width as f64;
        let h = image_height as f64;

        // clip to the image before normalizing
        let left = x.max(0.0).min(w);
        let top = y.max(0.0).min(h);
        let right = (x + width).max(0.0).min(w);
        let bottom = (y + height).max(0.0).min(h);

        Self::new(
            left / w,
            1.0 - bottom / h,
            (right - left) / w,
            (bottom - top) / h,
        )
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> NormalizedPoint {
        NormalizedPoint {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Smallest rectangle enclosing every point
    pub fn enclosing(points: &[NormalizedPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
