//! OCR throttling and change detection
//!
//! OCR is expensive and the card is held still, so it only runs every
//! `frequency` frames. A recognized title only triggers a lookup when it is
//! long enough to not be noise and differs from the last accepted title.

use tracing::debug;

/// Decides when to run OCR and which results are new
#[derive(Debug, Clone)]
pub struct RecognitionGate {
    frequency: u64,
    min_len: usize,
    frame_counter: u64,
    last_text: String,
}

impl RecognitionGate {
    /// `frequency` of zero is treated as one
    pub fn new(frequency: u64, min_len: usize) -> Self {
        Self {
            frequency: frequency.max(1),
            min_len,
            frame_counter: 0,
            last_text: String::new(),
        }
    }

    /// Count a frame; true when OCR should run on it
    pub fn tick(&mut self) -> bool {
        self.frame_counter += 1;
        self.should_run_ocr(self.frame_counter)
    }

    /// OCR runs on counter values divisible by the frequency
    pub fn should_run_ocr(&self, counter: u64) -> bool {
        counter % self.frequency == 0
    }

    /// Accept `text` as a new trigger, remembering it on success
    pub fn accept(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.chars().count() <= self.min_len {
            debug!("Ignoring short OCR text {:?}", text);
            return false;
        }
        if text.to_lowercase() == self.last_text.to_lowercase() {
            return false;
        }

        self.last_text = text.to_string();
        true
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn last_text(&self) -> &str {
        &self.last_text
    }
}
