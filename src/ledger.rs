//! Durable record of the occurrences that have already been notified
//!
//! The ledger is what makes repeated runs idempotent: an occurrence whose identity is in the
//! ledger is never notified again. It only ever grows, and membership is permanent.

use std::collections::HashSet;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::OccurrenceId;

/// A set of occurrence identities that have already been notified
pub trait ProcessedLedger {
    /// Has this occurrence already been notified?
    fn contains(&self, id: &OccurrenceId) -> bool;

    /// Durably record that this occurrence has been notified.
    ///
    /// Recording the same identity twice is harmless (the ledger is a set). A failure here means
    /// the occurrence could not be marked as notified: the caller must not treat the dispatch as
    /// fully done, since the next run may send it again.
    fn record(&mut self, id: &OccurrenceId) -> Result<(), Box<dyn Error>>;
}

/// A [`ProcessedLedger`] backed by an append-only text file, one occurrence identity per line.
///
/// The whole file is read once when the ledger is loaded; every successful [`record`](ProcessedLedger::record)
/// appends one line and updates the in-memory set, so that later events of the same run see it. \
/// Note there is no locking: if two runs of the whole program ever overlap, both can read the file
/// before either appends to it. Scheduling runs one at a time is the responsibility of whatever
/// invokes this program.
#[derive(Debug)]
pub struct FileLedger {
    backing_file: PathBuf,
    seen: HashSet<String>,
}

impl FileLedger {
    /// Load the ledger from its backing file.
    ///
    /// A file that does not exist yet is not an error: it is simply an empty ledger
    /// (the file gets created on the first recording).
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let seen = match std::fs::read_to_string(path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(err) => {
                return Err(format!("Unable to read ledger file {:?}: {}", path, err).into());
            },
            Ok(content) => {
                content.lines()
                    .filter(|line| line.is_empty() == false)
                    .map(|line| line.to_string())
                    .collect()
            },
        };

        Ok(Self {
            backing_file: PathBuf::from(path),
            seen,
        })
    }

    /// How many occurrences have been recorded so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl ProcessedLedger for FileLedger {
    fn contains(&self, id: &OccurrenceId) -> bool {
        self.seen.contains(id.as_str())
    }

    fn record(&mut self, id: &OccurrenceId) -> Result<(), Box<dyn Error>> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.backing_file)
            .map_err(|err| format!("Unable to open ledger file {:?}: {}", self.backing_file, err))?;

        writeln!(file, "{}", id)
            .map_err(|err| format!("Unable to append to ledger file {:?}: {}", self.backing_file, err))?;

        self.seen.insert(id.as_str().to_string());
        Ok(())
    }
}

/// A [`ProcessedLedger`] that only lives in memory. Useful for tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    seen: HashSet<String>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl ProcessedLedger for MemoryLedger {
    fn contains(&self, id: &OccurrenceId) -> bool {
        self.seen.contains(id.as_str())
    }

    fn record(&mut self, id: &OccurrenceId) -> Result<(), Box<dyn Error>> {
        self.seen.insert(id.as_str().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn id(event_name: &str, day: u32) -> OccurrenceId {
        let start = NaiveDate::from_ymd_opt(2025, 1, day).unwrap().and_hms_opt(11, 0, 0).unwrap();
        OccurrenceId::new(event_name, start)
    }

    #[test]
    fn test_missing_file_is_an_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::load(&dir.path().join("does_not_exist.txt")).unwrap();
        assert!(ledger.is_empty());
        assert!(ledger.contains(&id("Daily planning", 9)) == false);
    }

    #[test]
    fn test_record_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_events.txt");

        let mut ledger = FileLedger::load(&path).unwrap();
        ledger.record(&id("Daily planning", 9)).unwrap();
        ledger.record(&id("Daily planning", 10)).unwrap();

        // Visible in the same run...
        assert!(ledger.contains(&id("Daily planning", 9)));
        assert_eq!(ledger.len(), 2);

        // ...and in the next one
        let reloaded = FileLedger::load(&path).unwrap();
        assert!(reloaded.contains(&id("Daily planning", 9)));
        assert!(reloaded.contains(&id("Daily planning", 10)));
        assert!(reloaded.contains(&id("Daily planning", 11)) == false);
    }

    #[test]
    fn test_duplicate_records_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_events.txt");

        let mut ledger = FileLedger::load(&path).unwrap();
        ledger.record(&id("Daily planning", 9)).unwrap();
        ledger.record(&id("Daily planning", 9)).unwrap();

        // Duplicate lines in the file still load as a single membership
        let reloaded = FileLedger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_events.txt");
        std::fs::write(&path, "Daily planning_2025-01-09\n\nDaily planning_2025-01-10\n").unwrap();

        let ledger = FileLedger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&id("Daily planning", 9)));
    }

    #[test]
    fn test_record_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // The backing "file" is a directory: appending must fail, not panic
        let mut ledger = FileLedger::load(&dir.path().join("does_not_exist.txt")).unwrap();
        ledger.backing_file = dir.path().to_path_buf();
        assert!(ledger.record(&id("Daily planning", 9)).is_err());
    }
}
