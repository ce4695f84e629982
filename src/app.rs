//! Scan loop coordinator
//!
//! Runs capture → zoom → OCR gate → render → keys on the calling thread.
//! Lookups are handed to the dispatcher and never awaited inside the loop.

use anyhow::Result;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::analysis::RecognitionGate;
use crate::capture::{CaptureDevice, Frame, RegionOfInterest};
use crate::config::{AppConfig, RecognitionSettings};
use crate::controls::{FocusControl, KeyAction, KeyBindings};
use crate::error::ScanError;
use crate::lookup::LookupDispatcher;
use crate::overlay::FrameRenderer;
use crate::shared::SharedSession;
use crate::vision::{FramePreprocessor, OcrEngine};

/// Collaborators the scanner drives
pub struct ScannerParts {
    pub device: Box<dyn CaptureDevice>,
    pub renderer: Box<dyn FrameRenderer>,
    pub ocr: Box<dyn OcrEngine>,
    pub dispatcher: LookupDispatcher,
    pub session: SharedSession,
    pub runtime: Handle,
}

/// Totals reported when the loop ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub frames: u64,
    pub lookups: u64,
    pub saved: usize,
}

/// Main application coordinator
pub struct CardScanner {
    device: Box<dyn CaptureDevice>,
    renderer: Box<dyn FrameRenderer>,
    ocr: Box<dyn OcrEngine>,
    dispatcher: LookupDispatcher,
    session: SharedSession,
    runtime: Handle,
    preprocessor: FramePreprocessor,
    gate: RecognitionGate,
    bindings: KeyBindings,
    focus: FocusControl,
    recognition: RecognitionSettings,
    zoom: f32,
    /// Lookups still running, awaited on shutdown
    pending: Vec<JoinHandle<()>>,
}

impl CardScanner {
    pub fn new(parts: ScannerParts, config: &AppConfig) -> Result<Self> {
        let bindings = KeyBindings::from_settings(&config.controls)?;
        let gate = RecognitionGate::new(
            config.recognition.ocr_frequency,
            config.recognition.min_text_len,
        );
        let focus = FocusControl::new(config.capture.initial_focus, config.controls.focus_step);

        Ok(Self {
            device: parts.device,
            renderer: parts.renderer,
            ocr: parts.ocr,
            dispatcher: parts.dispatcher,
            session: parts.session,
            runtime: parts.runtime,
            preprocessor: FramePreprocessor::new(),
            gate,
            bindings,
            focus,
            recognition: config.recognition.clone(),
            zoom: config.capture.zoom_factor,
            pending: Vec::new(),
        })
    }

    /// Run until the quit key or the end of the feed, then release the device
    pub fn run(mut self) -> ScanSummary {
        info!("Align card title in the box. Focus: {}", self.focus.level());

        loop {
            let frame = match self.device.read_frame() {
                Ok(Some(frame)) => frame.zoomed(self.zoom),
                Ok(None) => {
                    info!("Capture feed ended");
                    break;
                }
                Err(e) => {
                    error!("Capture failed: {}", e);
                    break;
                }
            };

            let (width, height) = frame.dimensions();
            let roi = RegionOfInterest::title_box(
                width,
                height,
                self.recognition.box_width,
                self.recognition.box_height,
                self.recognition.box_raise,
            );

            if self.gate.tick() {
                self.recognize(&frame, &roi);
            }

            let snapshot = self.session.read().clone();
            let key = match self.renderer.render(frame, &roi, &snapshot) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Render failed: {}", e);
                    None
                }
            };

            if let Some(action) = key.and_then(|k| self.bindings.action(k)) {
                if action == KeyAction::Quit {
                    info!("Quit requested");
                    break;
                }
                self.change_focus(action);
            }

            self.pending.retain(|handle| !handle.is_finished());
        }

        self.shutdown()
    }

    /// Preprocess and OCR the title region, dispatching a lookup for new text
    fn recognize(&mut self, frame: &Frame, roi: &RegionOfInterest) {
        let binary = match self.preprocessor.process(frame, roi) {
            Ok(binary) => binary,
            Err(e) => {
                warn!("Skipping OCR: {}", e);
                return;
            }
        };

        debug!("OCR on frame captured {:?} ago", frame.timestamp.elapsed());
        let text = match self.ocr.recognize(&binary) {
            Ok(text) => text,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        if !self.gate.accept(&text) {
            return;
        }

        debug!("New title text {:?}", text);
        self.session.write().last_recognized_text = self.gate.last_text().to_string();
        self.pending.push(self.dispatcher.dispatch(&text));
    }

    fn change_focus(&mut self, action: KeyAction) {
        let Some(level) = self.focus.apply(action) else {
            return;
        };
        if let Err(e) = self.device.set_focus(level) {
            warn!("Failed to set focus: {}", e);
        }
        self.session.write().focus = level;
    }

    /// Let in-flight lookups finish, then release the device and renderer
    fn shutdown(mut self) -> ScanSummary {
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            info!("Waiting for {} lookup(s) to finish", pending.len());
            self.runtime.block_on(async {
                for handle in pending {
                    if let Err(e) = handle.await {
                        warn!("Lookup task failed: {}", e);
                    }
                }
            });
        }

        self.device.release();
        self.renderer.close();

        let summary = ScanSummary {
            frames: self.gate.frame_counter(),
            lookups: self.dispatcher.dispatched(),
            saved: self.session.read().scanned_count,
        };
        info!(
            "Scanned {} frames, {} lookups, {} cards saved",
            summary.frames, summary.lookups, summary.saved
        );
        summary
    }
}

/// Surface a device failure at startup as a fatal error after releasing it
pub fn open_device(device: &mut dyn CaptureDevice, config: &AppConfig) -> Result<(), ScanError> {
    if let Err(e) = crate::capture::prepare_device(device, &config.capture) {
        device.release();
        return Err(e);
    }
    Ok(())
}
