//! Overlay description and drawing
//!
//! Builds the layout shown on top of each frame (title box, info panel and
//! its text lines) from a session snapshot, and draws the shapes onto the
//! frame. Text is described, not rasterized.

pub mod preview;

pub use preview::PreviewRenderer;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::capture::{Frame, RegionOfInterest};
use crate::error::ScanResult;
use crate::shared::SessionState;

/// Title box color once a card is found
pub const FOUND_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Title box color while scanning
pub const SCANNING_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
/// Panel background and its opacity
const PANEL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const PANEL_ALPHA: f32 = 0.6;
/// Gap between title box and panel, and panel height
const PANEL_GAP: u32 = 20;
const PANEL_HEIGHT: u32 = 130;

/// Draws a frame with its overlay and reports key presses
pub trait FrameRenderer {
    /// Present `frame` for `session`; returns the key pressed since the
    /// last call, if any
    fn render(
        &mut self,
        frame: Frame,
        roi: &RegionOfInterest,
        session: &SessionState,
    ) -> ScanResult<Option<char>>;

    /// Tear down any window or resources
    fn close(&mut self) {}
}

/// One line of overlay text
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLine {
    pub text: String,
    /// Baseline position in frame pixels
    pub x: u32,
    pub y: u32,
    pub color: Rgb<u8>,
}

/// Everything drawn on top of a frame
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayout {
    pub roi: RegionOfInterest,
    pub roi_color: Rgb<u8>,
    /// Panel as (x, y, width, height)
    pub panel: (u32, u32, u32, u32),
    pub lines: Vec<OverlayLine>,
}

impl OverlayLayout {
    pub fn build(roi: &RegionOfInterest, session: &SessionState) -> Self {
        let card = &session.card;
        let roi_color = if card.found { FOUND_COLOR } else { SCANNING_COLOR };
        let info_y = roi.y2 + PANEL_GAP;
        let left = roi.x1 + 10;

        let line = |text: String, x: u32, y: u32, color: [u8; 3]| OverlayLine {
            text,
            x,
            y,
            color: Rgb(color),
        };

        let mut lines = vec![
            line("Align Title Here".to_string(), roi.x1, roi.y1.saturating_sub(10), roi_color.0),
            line(
                format!("Zoom: {}x | Focus: {}", session.zoom, session.focus),
                10,
                30,
                [255, 165, 0],
            ),
        ];

        if card.found {
            lines.push(line(card.name.clone(), left, info_y + 30, [255, 255, 255]));
            lines.push(line(card.set.clone(), left, info_y + 60, [200, 200, 200]));
            let price_x = roi.x2.saturating_sub(100);
            lines.push(line(card.price.clone(), price_x, info_y + 60, [0, 255, 0]));
        } else {
            lines.push(line("Scanning...".to_string(), left, info_y + 30, [255, 255, 255]));
        }

        lines.push(line(
            format!("Total Scanned: {}", session.scanned_count),
            left,
            info_y + 90,
            [255, 255, 0],
        ));

        if !session.last_save_message.is_empty() {
            lines.push(line(session.last_save_message.clone(), left, info_y + 120, [50, 255, 50]));
        }

        Self {
            roi: *roi,
            roi_color,
            panel: (roi.x1, info_y, roi.width(), PANEL_HEIGHT),
            lines,
        }
    }

    /// Draw the title box and the translucent panel onto `image`
    pub fn draw(&self, image: &mut RgbImage) {
        let (w, h) = image.dimensions();

        let (px, py, pw, ph) = self.panel;
        for y in py..(py + ph).min(h) {
            for x in px..(px + pw).min(w) {
                let pixel = image.get_pixel_mut(x, y);
                for c in 0..3 {
                    let blended = PANEL_ALPHA * PANEL_COLOR[c] as f32
                        + (1.0 - PANEL_ALPHA) * pixel[c] as f32;
                    pixel[c] = blended.round() as u8;
                }
            }
        }

        // two pixel outline
        for inset in 0..2 {
            let width = self.roi.width().saturating_sub(2 * inset);
            let height = self.roi.height().saturating_sub(2 * inset);
            if width == 0 || height == 0 {
                break;
            }
            let rect = Rect::at((self.roi.x1 + inset) as i32, (self.roi.y1 + inset) as i32)
                .of_size(width, height);
            draw_hollow_rect_mut(image, rect, self.roi_color);
        }
    }

    /// Panel text joined into one line, for logging
    pub fn summary(&self) -> String {
        self.lines
            .iter()
            .skip(2)
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
