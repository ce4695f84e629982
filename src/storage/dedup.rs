//! Deduplicating scan recorder
//!
//! A resolved card is saved only when its name differs from the most recent
//! log entry. Lookups for one physical card often fire several times as OCR
//! jitters, and all of them resolve to the same name.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ScanLog, ScanLogEntry};
use crate::shared::{CardInfo, SharedSession};

/// Scan log handle shared by every lookup task
pub type SharedScanLog = Arc<Mutex<dyn ScanLog>>;

/// What happened to a resolved card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Same name as the previous entry, nothing written
    Duplicate,
    /// Appended to the log and counted
    Added,
    /// Write failed, nothing counted
    Failed,
}

/// Writes new cards to the scan log and updates the session counters
pub struct ScanRecorder {
    log: SharedScanLog,
    session: SharedSession,
}

impl ScanRecorder {
    pub fn new(log: SharedScanLog, session: SharedSession) -> Self {
        Self { log, session }
    }

    /// Save `card` unless it repeats the previous entry
    pub fn record(&self, card: &CardInfo) -> RecordOutcome {
        // Held across check and append so overlapping lookups cannot both pass
        let mut log = self.log.lock();

        if log.last_entry().map(|last| last.name == card.name).unwrap_or(false) {
            debug!("Skipping repeat of {:?}", card.name);
            return RecordOutcome::Duplicate;
        }

        let entry = ScanLogEntry::now(card);
        match log.append_entry(&entry) {
            Ok(()) => {
                self.session.write().record_saved(&card.name);
                info!("Saved: {}", card.name);
                RecordOutcome::Added
            }
            Err(e) => {
                warn!("Error saving scan of {:?}: {}", card.name, e);
                RecordOutcome::Failed
            }
        }
    }
}
