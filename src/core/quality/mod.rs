//! # Quality Analysis Module
//!
//! Measures image quality and labels every record.
//!
//! - Brightness is the mean luma of the grayscale image (0-255)
//! - Sharpness is the mean gradient magnitude of the grayscale image, taken
//!   after shrinking anything larger than 1024px on its long side
//!
//! Flags derived from those numbers feed both labelling and recommendations.

mod analyzer;

pub use analyzer::{looks_like_screenshot, AnalysisResult, QualityAnalyzer, SCREENSHOT_TOKENS};

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

/// Images narrower or shorter than this are "small"
pub const SMALL_WIDTH: u32 = 800;
pub const SMALL_HEIGHT: u32 = 600;
/// Mean luma below this is "dark"
pub const DARK_BRIGHTNESS: f64 = 50.0;
/// Mean gradient magnitude below this is "low sharpness"
pub const LOW_SHARPNESS: f64 = 5.0;
/// Long side above which images are downscaled before measuring sharpness
pub const SHARPNESS_MAX_SIDE: u32 = 1024;

/// Quality metrics for an image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub width: u32,
    pub height: u32,
    /// Mean luma (0-255)
    pub brightness: f64,
    /// Mean gradient magnitude; 0 for a flat image
    pub sharpness: f64,
    pub is_small: bool,
    pub is_dark: bool,
    pub is_low_sharpness: bool,
}

impl QualityMetrics {
    /// Derive the flags from raw measurements
    pub fn from_measurements(width: u32, height: u32, brightness: f64, sharpness: f64) -> Self {
        Self {
            width,
            height,
            brightness,
            sharpness,
            is_small: width < SMALL_WIDTH || height < SMALL_HEIGHT,
            is_dark: brightness < DARK_BRIGHTNESS,
            is_low_sharpness: sharpness < LOW_SHARPNESS,
        }
    }

    /// Measure a decoded image
    pub fn measure(image: &DynamicImage) -> Self {
        let gray = image.to_luma8();
        Self::from_measurements(
            image.width(),
            image.height(),
            mean_brightness(&gray),
            estimate_sharpness(image),
        )
    }

    /// Any of the three low-quality flags set
    pub fn is_low_quality(&self) -> bool {
        self.is_small || self.is_dark || self.is_low_sharpness
    }
}

/// Mean pixel value of a grayscale image
pub fn mean_brightness(gray: &GrayImage) -> f64 {
    let count = gray.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    gray.as_raw().iter().map(|&p| p as f64).sum::<f64>() / count as f64
}

/// Mean gradient magnitude, downscaling large images first.
pub fn estimate_sharpness(image: &DynamicImage) -> f64 {
    let (width, height) = (image.width(), image.height());
    let long_side = width.max(height);

    let gray = if long_side > SHARPNESS_MAX_SIDE {
        let ratio = SHARPNESS_MAX_SIDE as f64 / long_side as f64;
        let w = ((width as f64 * ratio) as u32).max(1);
        let h = ((height as f64 * ratio) as u32).max(1);
        image
            .resize_exact(w, h, image::imageops::FilterType::Triangle)
            .to_luma8()
    } else {
        image.to_luma8()
    };

    gradient_magnitude_mean(&gray)
}

/// Central differences inside, one-sided differences on the borders.
fn gradient_magnitude_mean(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 2 || height < 2 {
        return 0.0;
    }

    let at = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f64;
    let derivative = |i: u32, n: u32, f: &dyn Fn(u32) -> f64| -> f64 {
        if i == 0 {
            f(1) - f(0)
        } else if i == n - 1 {
            f(n - 1) - f(n - 2)
        } else {
            (f(i + 1) - f(i - 1)) / 2.0
        }
    };

    let mut total = 0.0;
    for y in 0..height {
        for x in 0..width {
            let gx = derivative(x, width, &|i| at(i, y));
            let gy = derivative(y, height, &|j| at(x, j));
            total += (gx * gx + gy * gy).sqrt();
        }
    }

    total / (width as f64 * height as f64)
}
