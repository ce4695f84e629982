//! Session state shared between the scan loop and lookup tasks

use parking_lot::RwLock;
use std::sync::Arc;

/// Handle to the session state, cloned into every lookup task
pub type SharedSession = Arc<RwLock<SessionState>>;

/// Most recently resolved lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    /// Card name
    pub name: String,
    /// Set name
    pub set: String,
    /// Formatted price, e.g. "$5.00" or "N/A"
    pub price: String,
    /// Whether the last lookup succeeded
    pub found: bool,
}

impl Default for CardInfo {
    fn default() -> Self {
        Self {
            name: "Scanning...".to_string(),
            set: String::new(),
            price: "...".to_string(),
            found: false,
        }
    }
}

impl CardInfo {
    /// Copy of this card marked as not found
    pub fn not_found(&self) -> Self {
        Self {
            found: false,
            ..self.clone()
        }
    }
}

/// Process-lifetime session state, never persisted
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Last OCR text that triggered a lookup
    pub last_recognized_text: String,
    /// Cards saved during this session
    pub scanned_count: usize,
    /// Confirmation of the last save, empty until something is saved
    pub last_save_message: String,
    /// Current lookup result
    pub card: CardInfo,
    /// Manual focus level shown in the overlay
    pub focus: u8,
    /// Digital zoom factor shown in the overlay
    pub zoom: f32,
    /// Generation of the lookup whose result is displayed
    applied_generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            last_recognized_text: String::new(),
            scanned_count: 0,
            last_save_message: String::new(),
            card: CardInfo::default(),
            focus: 0,
            zoom: 1.0,
            applied_generation: 0,
        }
    }
}

impl SessionState {
    pub fn new(focus: u8, zoom: f32) -> Self {
        Self {
            focus,
            zoom,
            ..Self::default()
        }
    }

    /// Wrap into a shareable handle
    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    /// Replace the card with the result of lookup `generation`.
    ///
    /// With `discard_stale` set, results from lookups older than the one
    /// already displayed are dropped and `false` is returned.
    pub fn apply_card(&mut self, generation: u64, card: CardInfo, discard_stale: bool) -> bool {
        if discard_stale && generation <= self.applied_generation {
            return false;
        }
        self.applied_generation = self.applied_generation.max(generation);
        self.card = card;
        true
    }

    /// Mark the displayed card as not found after lookup `generation` failed
    pub fn apply_failure(&mut self, generation: u64, discard_stale: bool) -> bool {
        let card = self.card.not_found();
        self.apply_card(generation, card, discard_stale)
    }

    /// Record a successful save
    pub fn record_saved(&mut self, name: &str) {
        self.scanned_count += 1;
        self.last_save_message = format!("ADDED: {}", name);
    }
}
