//! Application Configuration
//!
//! User settings stored in TOML format. Every field has a default, so a
//! partial file only overrides what it names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture device settings
    pub capture: CaptureSettings,
    /// OCR gating and region placement
    pub recognition: RecognitionSettings,
    /// Card lookup service settings
    pub lookup: LookupSettings,
    /// Scan log settings
    pub storage: StorageSettings,
    /// Keyboard bindings
    pub controls: ControlSettings,
    /// Overlay preview output
    pub overlay: OverlaySettings,
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Directory of still images replayed as the video feed
    pub source: Option<PathBuf>,
    /// Requested frame width
    pub width: u32,
    /// Requested frame height
    pub height: u32,
    /// Manual focus level at startup (0-255)
    pub initial_focus: u8,
    /// Digital zoom factor, 1.0 disables the zoom crop
    pub zoom_factor: f32,
    /// Maximum frames per second delivered by the device
    pub max_fps: u32,
    /// Restart the image sequence when it runs out
    pub loop_playback: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            source: None,
            width: 1920,
            height: 1080,
            initial_focus: 25,
            zoom_factor: 1.0,
            max_fps: 30,
            loop_playback: false,
        }
    }
}

/// OCR gating and title box placement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Run OCR once every N frames
    pub ocr_frequency: u64,
    /// Texts of this many characters or fewer are treated as noise
    pub min_text_len: usize,
    /// Title box width in pixels
    pub box_width: u32,
    /// Title box height in pixels
    pub box_height: u32,
    /// How far above the frame center the box sits
    pub box_raise: u32,
    /// Tesseract language
    pub language: String,
    /// Tesseract page segmentation mode
    pub page_segmentation: i32,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            ocr_frequency: 15,
            min_text_len: 3,
            box_width: 400,
            box_height: 60,
            box_raise: 100,
            language: "eng".to_string(),
            // single text line
            page_segmentation: 7,
        }
    }
}

/// Card lookup service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    /// Fuzzy name endpoint
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Drop completions older than the last applied one
    pub discard_stale: bool,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.scryfall.com/cards/named".to_string(),
            timeout_secs: 5,
            discard_stale: true,
        }
    }
}

/// Scan log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// CSV file receiving one row per new card
    pub log_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("scanned_cards.csv"),
        }
    }
}

/// Keyboard bindings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub quit: String,
    pub focus_down: String,
    pub focus_up: String,
    /// Focus change per key press
    pub focus_step: u8,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            quit: "q".to_string(),
            focus_down: "[".to_string(),
            focus_up: "]".to_string(),
            focus_step: 5,
        }
    }
}

/// Overlay-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Image file receiving the annotated frame
    pub preview_path: Option<PathBuf>,
    /// Write the preview once every N frames
    pub preview_every: u64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            preview_path: None,
            preview_every: 15,
        }
    }
}

impl AppConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.recognition.ocr_frequency == 0 {
            anyhow::bail!("recognition.ocr_frequency must be at least 1");
        }
        if self.recognition.box_width == 0 || self.recognition.box_height == 0 {
            anyhow::bail!("title box must have a non-zero size");
        }
        if !(self.capture.zoom_factor >= 1.0) {
            anyhow::bail!("capture.zoom_factor must be >= 1.0");
        }
        if self.lookup.timeout_secs == 0 {
            anyhow::bail!("lookup.timeout_secs must be at least 1");
        }
        crate::controls::KeyBindings::from_settings(&self.controls)?;
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
