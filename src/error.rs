//! Error taxonomy for the scanning pipeline
//!
//! Only `DeviceUnavailable` is fatal. Every other variant is logged where it
//! happens and the loop carries on.

use thiserror::Error;

/// Errors raised by pipeline stages
#[derive(Debug, Error)]
pub enum ScanError {
    /// Region of interest is empty or falls outside the frame
    #[error("invalid region ({x1}, {y1})-({x2}, {y2}) for {width}x{height} frame")]
    InvalidRegion {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        width: u32,
        height: u32,
    },

    /// Card lookup failed (network, status, body or timeout)
    #[error("lookup failed: {0}")]
    LookupFailure(String),

    /// Writing the scan log failed
    #[error("could not persist scan: {0}")]
    PersistenceFailure(#[from] std::io::Error),

    /// Capture device could not be opened or configured
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// OCR engine failed on an image
    #[error("ocr failed: {0}")]
    Ocr(String),
}

pub type ScanResult<T> = std::result::Result<T, ScanError>;
