//! Camera Capture Layer
//!
//! The scanner only talks to a camera through [`CaptureDevice`]. The bundled
//! device replays still images from a directory so the pipeline can run
//! without camera drivers.

pub mod frame;
pub mod sequence;

pub use frame::{Frame, RegionOfInterest};
pub use sequence::ImageSequenceDevice;

use crate::config::CaptureSettings;
use crate::error::ScanResult;

/// Highest manual focus level a device accepts
pub const MAX_FOCUS: u8 = 255;

/// Camera collaborator used by the scan loop
pub trait CaptureDevice {
    /// Open the default device
    fn open(&mut self) -> ScanResult<()>;

    /// Request a frame resolution
    fn set_resolution(&mut self, width: u32, height: u32) -> ScanResult<()>;

    /// Enable or disable autofocus
    fn set_autofocus(&mut self, enabled: bool) -> ScanResult<()>;

    /// Set a manual focus level (0-255)
    fn set_focus(&mut self, level: u8) -> ScanResult<()>;

    /// Read the next frame, `None` once the device stops delivering
    fn read_frame(&mut self) -> ScanResult<Option<Frame>>;

    /// Release the device
    fn release(&mut self);
}

/// Open a device and apply the startup settings: resolution, manual focus
pub fn prepare_device(
    device: &mut dyn CaptureDevice,
    settings: &CaptureSettings,
) -> ScanResult<()> {
    device.open()?;
    device.set_resolution(settings.width, settings.height)?;
    device.set_autofocus(false)?;
    device.set_focus(settings.initial_focus)?;
    Ok(())
}
