//! OCR (Optical Character Recognition) module
//!
//! Uses the system Tesseract through rusty-tesseract. Card titles are a single
//! line, so the default page segmentation mode is 7.

use image::{DynamicImage, GrayImage};
use rusty_tesseract::{Args, Image};
use std::collections::HashMap;
use tracing::debug;

use crate::config::RecognitionSettings;
use crate::error::{ScanError, ScanResult};

/// Text extraction from a binarized title image
pub trait OcrEngine {
    /// Recognize the text of `image`, trimmed of surrounding whitespace
    fn recognize(&self, image: &GrayImage) -> ScanResult<String>;
}

/// Tesseract-backed OCR engine
pub struct TesseractOcr {
    args: Args,
}

impl TesseractOcr {
    pub fn new(settings: &RecognitionSettings) -> Self {
        let args = Args {
            lang: settings.language.clone(),
            config_variables: HashMap::new(),
            dpi: Some(150),
            psm: Some(settings.page_segmentation),
            oem: Some(3),
        };
        Self { args }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &GrayImage) -> ScanResult<String> {
        let dynamic = DynamicImage::ImageLuma8(image.clone());
        let tess_img = Image::from_dynamic_image(&dynamic)
            .map_err(|e| ScanError::Ocr(format!("Failed to create tesseract image: {}", e)))?;

        let text = rusty_tesseract::image_to_string(&tess_img, &self.args)
            .map_err(|e| ScanError::Ocr(e.to_string()))?;

        let text = text.trim().to_string();
        debug!("OCR read {:?}", text);
        Ok(text)
    }
}
