//! In-memory scan log for tests

use std::io;

use super::{ScanLog, ScanLogEntry};
use crate::error::{ScanError, ScanResult};

#[derive(Debug, Default)]
pub struct MemoryScanLog {
    pub entries: Vec<ScanLogEntry>,
    /// Fail every append with an I/O error
    pub fail_writes: bool,
}

impl ScanLog for MemoryScanLog {
    fn append_entry(&mut self, entry: &ScanLogEntry) -> ScanResult<()> {
        if self.fail_writes {
            return Err(ScanError::PersistenceFailure(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.entries.push(entry.clone());
        Ok(())
    }

    fn last_entry(&self) -> Option<&ScanLogEntry> {
        self.entries.last()
    }
}
