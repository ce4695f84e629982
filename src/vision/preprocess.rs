//! Title region preprocessing for OCR
//!
//! Crops the region of interest, converts it to luminance, smooths it with a
//! fixed Gaussian kernel and binarizes it with Otsu's threshold.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::vertical_filter;
use tracing::debug;

use crate::capture::{Frame, RegionOfInterest};
use crate::error::ScanResult;

/// Gaussian kernel length
pub const KERNEL_SIZE: usize = 9;
/// Gaussian kernel sigma
pub const KERNEL_SIGMA: f32 = 1.5;

/// Turns a frame region into a black/white image ready for OCR
#[derive(Debug, Clone)]
pub struct FramePreprocessor {
    kernel: Vec<f32>,
}

impl Default for FramePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FramePreprocessor {
    pub fn new() -> Self {
        Self {
            kernel: gaussian_kernel(KERNEL_SIZE, KERNEL_SIGMA),
        }
    }

    /// Run the full pipeline on `roi` of `frame`
    pub fn process(&self, frame: &Frame, roi: &RegionOfInterest) -> ScanResult<GrayImage> {
        let (width, height) = frame.dimensions();
        roi.check_within(width, height)?;

        let cropped =
            image::imageops::crop_imm(&frame.image, roi.x1, roi.y1, roi.width(), roi.height())
                .to_image();
        let gray = to_luma(&cropped);
        let smoothed = vertical_filter(&gray, &self.kernel);

        let level = otsu_level(&smoothed);
        debug!("Otsu level {} for {}x{} region", level, roi.width(), roi.height());

        Ok(threshold(&smoothed, level, ThresholdType::Binary))
    }
}

/// Luminance with the standard 0.299/0.587/0.114 weights
fn to_luma(image: &RgbImage) -> GrayImage {
    let (w, h) = image.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let p = image.get_pixel(x, y);
        let gray = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
        Luma([gray.round().clamp(0.0, 255.0) as u8])
    })
}

/// Normalized 1-D Gaussian kernel of `size` taps
fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let center = (size as f32 - 1.0) / 2.0;
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|v| v / sum).collect()
}
