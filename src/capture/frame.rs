//! Frame data structures for captured camera content

use image::imageops::{self, FilterType};
use image::RgbImage;
use std::time::Instant;

use crate::error::{ScanError, ScanResult};

/// A captured frame from the camera
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGB pixel data
    pub image: RgbImage,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Create a new captured frame
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            timestamp: Instant::now(),
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Digital zoom: crop the center `1/factor` of the frame and scale it
    /// back up to the original size
    pub fn zoomed(self, factor: f32) -> Self {
        if factor <= 1.0 {
            return self;
        }

        let (w, h) = self.dimensions();
        let new_w = ((w as f32 / factor) as u32).max(1);
        let new_h = ((h as f32 / factor) as u32).max(1);
        let x = (w - new_w) / 2;
        let y = (h - new_h) / 2;

        let cropped = imageops::crop_imm(&self.image, x, y, new_w, new_h).to_image();
        let image = imageops::resize(&cropped, w, h, FilterType::Triangle);

        Self {
            image,
            timestamp: self.timestamp,
        }
    }
}

/// Rectangle (x1, y1)-(x2, y2) within a frame, exclusive on the far edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionOfInterest {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl RegionOfInterest {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Title box of `box_w`x`box_h` centered horizontally, raised
    /// `raise` pixels above the vertical center
    pub fn title_box(frame_w: u32, frame_h: u32, box_w: u32, box_h: u32, raise: u32) -> Self {
        let x1 = frame_w.saturating_sub(box_w) / 2;
        let y1 = (frame_h.saturating_sub(box_h) / 2).saturating_sub(raise);
        Self::new(x1, y1, x1 + box_w, y1 + box_h)
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Ensure the region is non-empty and inside a `width`x`height` frame
    pub fn check_within(&self, width: u32, height: u32) -> ScanResult<()> {
        let inside =
            self.x1 < self.x2 && self.y1 < self.y2 && self.x2 <= width && self.y2 <= height;
        if inside {
            Ok(())
        } else {
            Err(ScanError::InvalidRegion {
                x1: self.x1,
                y1: self.y1,
                x2: self.x2,
                y2: self.y2,
                width,
                height,
            })
        }
    }
}
