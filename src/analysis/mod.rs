//! Recognition analysis
//!
//! Decides which frames get OCR and which OCR results become lookups.

pub mod gate;

pub use gate::RecognitionGate;
