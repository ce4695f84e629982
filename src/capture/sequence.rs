//! Image-sequence capture device
//!
//! Replays the images of a directory in file name order, one per frame.

use image::imageops::{self, FilterType};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{CaptureDevice, Frame};
use crate::error::{ScanError, ScanResult};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Capture device backed by a directory of still images
pub struct ImageSequenceDevice {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    resolution: Option<(u32, u32)>,
    autofocus: bool,
    focus: u8,
    loop_playback: bool,
    frame_interval: Option<Duration>,
    last_frame: Option<Instant>,
    opened: bool,
}

impl ImageSequenceDevice {
    /// Create a device for `dir`; nothing is read until [`CaptureDevice::open`]
    pub fn new(dir: impl Into<PathBuf>, max_fps: u32, loop_playback: bool) -> Self {
        let frame_interval = (max_fps > 0).then(|| Duration::from_secs_f64(1.0 / max_fps as f64));
        Self {
            dir: dir.into(),
            files: Vec::new(),
            cursor: 0,
            resolution: None,
            autofocus: true,
            focus: 0,
            loop_playback,
            frame_interval,
            last_frame: None,
            opened: false,
        }
    }

    fn list_images(dir: &Path) -> ScanResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ScanError::DeviceUnavailable(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_frame) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }
}

impl CaptureDevice for ImageSequenceDevice {
    fn open(&mut self) -> ScanResult<()> {
        let files = Self::list_images(&self.dir)?;
        if files.is_empty() {
            return Err(ScanError::DeviceUnavailable(format!(
                "no images in {}",
                self.dir.display()
            )));
        }

        info!("Opened image sequence {:?} ({} frames)", self.dir, files.len());
        self.files = files;
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn set_resolution(&mut self, width: u32, height: u32) -> ScanResult<()> {
        if width == 0 || height == 0 {
            return Err(ScanError::DeviceUnavailable(format!(
                "unsupported resolution {}x{}",
                width, height
            )));
        }
        self.resolution = Some((width, height));
        Ok(())
    }

    fn set_autofocus(&mut self, enabled: bool) -> ScanResult<()> {
        self.autofocus = enabled;
        Ok(())
    }

    fn set_focus(&mut self, level: u8) -> ScanResult<()> {
        debug!("Focus set to {}", level);
        self.focus = level;
        Ok(())
    }

    fn read_frame(&mut self) -> ScanResult<Option<Frame>> {
        if !self.opened {
            return Err(ScanError::DeviceUnavailable("device not open".to_string()));
        }

        // Skip unreadable files, but never spin through the list more than once per call
        for _ in 0..self.files.len() {
            if self.cursor >= self.files.len() {
                if !self.loop_playback {
                    return Ok(None);
                }
                self.cursor = 0;
            }

            let path = &self.files[self.cursor];
            self.cursor += 1;

            let image = match image::open(path) {
                Ok(img) => img.to_rgb8(),
                Err(e) => {
                    warn!("Skipping unreadable frame {:?}: {}", path, e);
                    continue;
                }
            };

            let image = match self.resolution {
                Some((w, h)) if image.dimensions() != (w, h) => {
                    imageops::resize(&image, w, h, FilterType::Triangle)
                }
                _ => image,
            };

            self.pace();
            return Ok(Some(Frame::new(image)));
        }

        Ok(None)
    }

    fn release(&mut self) {
        if self.opened {
            info!("Released image sequence {:?}", self.dir);
        }
        self.opened = false;
        self.files.clear();
        self.cursor = 0;
    }
}
