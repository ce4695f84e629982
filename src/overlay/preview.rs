//! Headless preview renderer
//!
//! Draws the overlay, optionally writes the annotated frame to an image file
//! every few frames, logs the info panel when it changes and takes key
//! presses from a channel (stdin by default).

use crossbeam_channel::{unbounded, Receiver};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, info, trace, warn};

use super::{FrameRenderer, OverlayLayout};
use crate::capture::{Frame, RegionOfInterest};
use crate::error::ScanResult;
use crate::shared::SessionState;

/// Renderer without a window
pub struct PreviewRenderer {
    keys: Receiver<char>,
    preview_path: Option<PathBuf>,
    preview_every: u64,
    frames: u64,
    last_summary: String,
}

impl PreviewRenderer {
    pub fn new(keys: Receiver<char>, preview_path: Option<PathBuf>, preview_every: u64) -> Self {
        Self {
            keys,
            preview_path,
            preview_every: preview_every.max(1),
            frames: 0,
            last_summary: String::new(),
        }
    }

    /// Renderer fed by keys typed on stdin (each line's characters, in order)
    pub fn with_stdin(preview_path: Option<PathBuf>, preview_every: u64) -> Self {
        Self::new(spawn_stdin_keys(), preview_path, preview_every)
    }
}

impl FrameRenderer for PreviewRenderer {
    fn render(
        &mut self,
        frame: Frame,
        roi: &RegionOfInterest,
        session: &SessionState,
    ) -> ScanResult<Option<char>> {
        self.frames += 1;
        let layout = OverlayLayout::build(roi, session);

        for line in &layout.lines {
            trace!(x = line.x, y = line.y, color = ?line.color.0, "{}", line.text);
        }

        let summary = layout.summary();
        if summary != self.last_summary {
            info!("{}", summary);
            self.last_summary = summary;
        }

        if let Some(path) = &self.preview_path {
            if self.frames % self.preview_every == 0 {
                let mut image = frame.image;
                layout.draw(&mut image);
                if let Err(e) = image.save(path) {
                    warn!("Failed to write preview {:?}: {}", path, e);
                }
            }
        }

        Ok(self.keys.try_recv().ok())
    }

    fn close(&mut self) {
        debug!("Preview renderer closed after {} frames", self.frames);
    }
}

/// Forward every character typed on stdin to a channel
fn spawn_stdin_keys() -> Receiver<char> {
    let (tx, rx) = unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            for key in line.chars() {
                if tx.send(key).is_err() {
                    return;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn frame() -> Frame {
        Frame::new(RgbImage::from_pixel(200, 200, Rgb([90, 90, 90])))
    }

    #[test]
    fn test_keys_are_passed_through() {
        let (tx, rx) = unbounded();
        let mut renderer = PreviewRenderer::new(rx, None, 1);
        let roi = RegionOfInterest::new(10, 10, 110, 30);
        let session = SessionState::default();

        assert_eq!(renderer.render(frame(), &roi, &session).unwrap(), None);
        tx.send('q').unwrap();
        assert_eq!(renderer.render(frame(), &roi, &session).unwrap(), Some('q'));
    }

    #[test]
    fn test_writes_preview() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preview.png");
        let (_tx, rx) = unbounded();
        let mut renderer = PreviewRenderer::new(rx, Some(path.clone()), 2);
        let roi = RegionOfInterest::new(10, 10, 110, 30);
        let session = SessionState::default();

        renderer.render(frame(), &roi, &session).unwrap();
        assert!(!path.exists());
        renderer.render(frame(), &roi, &session).unwrap();

        let written = image::open(&path).unwrap().to_rgb8();
        assert_eq!(*written.get_pixel(10, 10), super::super::SCANNING_COLOR);
    }
}
