//! Vision/OCR Layer
//!
//! Turns the title region of a frame into text.

pub mod ocr;
pub mod preprocess;

pub use ocr::{OcrEngine, TesseractOcr};
pub use preprocess::FramePreprocessor;
