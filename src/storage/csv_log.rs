//! CSV scan log
//!
//! One header row, then one row per saved scan. Existing files are only ever
//! appended to.

use chrono::NaiveDateTime;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

use super::{ScanLog, ScanLogEntry, TIMESTAMP_FORMAT};
use crate::error::ScanResult;

/// Header row of the log file
pub const HEADER: [&str; 4] = ["Timestamp", "Card Name", "Set", "Price"];

/// Scan log stored as a CSV file
pub struct CsvScanLog {
    path: PathBuf,
    last: Option<ScanLogEntry>,
}

impl CsvScanLog {
    /// Open `path`, writing the header if the file is new or blank.
    ///
    /// Existing content is never rewritten. The last readable row becomes the
    /// most recent entry, and a missing final line break is added so the next
    /// row starts on its own line.
    pub fn open(path: impl Into<PathBuf>) -> ScanResult<Self> {
        let path = path.into();
        let existing = match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut file = OpenOptions::new().append(true).create(true).open(&path)?;
        if !existing.is_empty() && !existing.ends_with('\n') {
            file.write_all(b"\r\n")?;
        }

        if existing.trim().is_empty() {
            file.write_all(format_row(&HEADER).as_bytes())?;
            file.sync_all()?;
            info!("Created scan log {:?}", path);
            return Ok(Self { path, last: None });
        }
        file.flush()?;

        let last = parse_records(&existing)
            .into_iter()
            .skip(1)
            .filter_map(|row| entry_from_row(&row))
            .last();
        info!("Appending to scan log {:?}", path);

        Ok(Self { path, last })
    }
}

impl ScanLog for CsvScanLog {
    fn append_entry(&mut self, entry: &ScanLogEntry) -> ScanResult<()> {
        let timestamp = entry.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let row = format_row(&[&timestamp, &entry.name, &entry.set, &entry.price]);

        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        file.write_all(row.as_bytes())?;
        file.flush()?;

        self.last = Some(entry.clone());
        Ok(())
    }

    fn last_entry(&self) -> Option<&ScanLogEntry> {
        self.last.as_ref()
    }
}

fn entry_from_row(row: &[String]) -> Option<ScanLogEntry> {
    let [timestamp, name, set, price] = row else {
        warn!("Ignoring malformed scan log row {:?}", row);
        return None;
    };
    let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
    Some(ScanLogEntry {
        timestamp,
        name: name.clone(),
        set: set.clone(),
        price: price.clone(),
    })
}

/// Quote a field when it holds a separator, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_row(fields: &[&str]) -> String {
    let mut row = fields.iter().map(|f| escape_field(f)).collect::<Vec<_>>().join(",");
    row.push_str("\r\n");
    row
}

/// Split CSV content into records, honouring quoted fields
fn parse_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn entry(name: &str, set: &str, price: &str) -> ScanLogEntry {
        ScanLogEntry {
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 30, 5)
                .unwrap(),
            name: name.to_string(),
            set: set.to_string(),
            price: price.to_string(),
        }
    }

    #[test]
    fn test_new_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.csv");

        let log = CsvScanLog::open(&path).unwrap();
        assert!(log.last_entry().is_none());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Timestamp,Card Name,Set,Price\r\n");
    }

    #[test]
    fn test_reopen_does_not_duplicate_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.csv");

        let mut log = CsvScanLog::open(&path).unwrap();
        log.append_entry(&entry("Black Lotus", "Vintage Masters", "$5.00")).unwrap();
        drop(log);

        let mut log = CsvScanLog::open(&path).unwrap();
        log.append_entry(&entry("Mox Pearl", "Alpha", "N/A")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Timestamp,Card Name").count(), 1);
        assert_eq!(
            content,
            "Timestamp,Card Name,Set,Price\r\n\
             2024-05-01 12:30:05,Black Lotus,Vintage Masters,$5.00\r\n\
             2024-05-01 12:30:05,Mox Pearl,Alpha,N/A\r\n"
        );
    }

    #[test]
    fn test_reopen_restores_last_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.csv");

        let mut log = CsvScanLog::open(&path).unwrap();
        log.append_entry(&entry("Black Lotus", "Vintage Masters", "$5.00")).unwrap();
        log.append_entry(&entry("Fire // Ice", "Apocalypse, Foil", "$1.25")).unwrap();
        drop(log);

        let log = CsvScanLog::open(&path).unwrap();
        assert_eq!(
            log.last_entry(),
            Some(&entry("Fire // Ice", "Apocalypse, Foil", "$1.25"))
        );
    }

    #[test]
    fn test_quoting() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");

        let records = parse_records("x,\"a,b\",\"say \"\"hi\"\"\"\r\n");
        assert_eq!(records, vec![vec!["x", "a,b", "say \"hi\""]]);
    }

    #[test]
    fn test_empty_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.csv");
        std::fs::write(&path, "").unwrap();

        CsvScanLog::open(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Timestamp,Card Name,Set,Price"));
    }

    #[test]
    fn test_append_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.csv");
        let mut log = CsvScanLog::open(&path).unwrap();

        std::fs::remove_dir_all(dir.path()).unwrap();
        assert!(log.append_entry(&entry("Black Lotus", "LEA", "$5.00")).is_err());
        assert!(log.last_entry().is_none());
    }

    #[test]
    fn test_reopen_tolerates_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.csv");
        let mut content = b"Timestamp,Card Name,Set,Price\r\n".to_vec();
        content.extend_from_slice(b"2024-05-01 12:30:05,Lim-D\xfbl's Vault,Legends,$1.00\r\n");
        std::fs::write(&path, &content).unwrap();

        let mut log = CsvScanLog::open(&path).unwrap();
        let last = log.last_entry().unwrap();
        assert!(last.name.starts_with("Lim-D"));
        assert_eq!(last.set, "Legends");

        log.append_entry(&entry("Mox Pearl", "Alpha", "N/A")).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert!(written.starts_with(&content));
        assert!(written.ends_with(b"2024-05-01 12:30:05,Mox Pearl,Alpha,N/A\r\n"));
    }

    #[test]
    fn test_reopen_terminates_unfinished_last_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.csv");
        std::fs::write(
            &path,
            "Timestamp,Card Name,Set,Price\r\n2024-05-01 12:30:05,Black Lotus,LEA,$5.00",
        )
        .unwrap();

        let mut log = CsvScanLog::open(&path).unwrap();
        assert_eq!(log.last_entry(), Some(&entry("Black Lotus", "LEA", "$5.00")));
        log.append_entry(&entry("Mox Pearl", "Alpha", "N/A")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Timestamp,Card Name,Set,Price\r\n\
             2024-05-01 12:30:05,Black Lotus,LEA,$5.00\r\n\
             2024-05-01 12:30:05,Mox Pearl,Alpha,N/A\r\n"
        );
        assert_eq!(parse_records(&content).len(), 3);
    }

    #[test]
    fn test_blank_file_is_not_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.csv");
        std::fs::write(&path, "  \n").unwrap();

        let log = CsvScanLog::open(&path).unwrap();
        assert!(log.last_entry().is_none());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "  \nTimestamp,Card Name,Set,Price\r\n");
    }
}
