//! Storage Layer
//!
//! Append-only scan log behind the [`ScanLog`] trait, plus the deduplicating
//! recorder that decides what gets written.

pub mod csv_log;
pub mod dedup;
#[cfg(test)]
pub mod memory;

pub use csv_log::CsvScanLog;
pub use dedup::{RecordOutcome, ScanRecorder};

use anyhow::Result;
use chrono::{Local, NaiveDateTime, Timelike};
use std::path::PathBuf;

use crate::error::ScanResult;
use crate::shared::CardInfo;

/// Timestamp layout used in the log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One saved scan; immutable once written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLogEntry {
    pub timestamp: NaiveDateTime,
    pub name: String,
    pub set: String,
    pub price: String,
}

impl ScanLogEntry {
    /// Entry for `card` stamped with the current local time, to the second
    pub fn now(card: &CardInfo) -> Self {
        let now = Local::now().naive_local();
        let timestamp = now.with_nanosecond(0).unwrap_or(now);
        Self {
            timestamp,
            name: card.name.clone(),
            set: card.set.clone(),
            price: card.price.clone(),
        }
    }
}

/// Append-only store of scan events
pub trait ScanLog: Send {
    /// Durably append one entry
    fn append_entry(&mut self, entry: &ScanLogEntry) -> ScanResult<()>;

    /// Most recently appended entry, if any
    fn last_entry(&self) -> Option<&ScanLogEntry>;
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "cardlister", "CardLister")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}
