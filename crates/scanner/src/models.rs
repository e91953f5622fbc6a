//! Scan results.

use crate::scan::error::Error as ItemError;
use dsfind_catalog::{DatastorePath, Exclusion, FileKind};
use std::time::Duration;
use time::OffsetDateTime;

/// One file found on one volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub volume: String,
    /// Folder the file was found in.
    pub folder: DatastorePath,
    /// Full path of the file.
    pub path: DatastorePath,
    /// Size in bytes; zero when sizes weren't requested.
    pub size: u64,
    pub modified: Option<OffsetDateTime>,
    pub owner: Option<String>,
    pub kind: Option<FileKind>,
}
impl MatchRecord {
    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or_default()
    }
}

/// A volume that was deliberately not searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedVolume {
    pub volume: String,
    pub reason: Exclusion,
}

/// Everything a finished scan produced.
///
/// Per-volume failures sit next to the matches; whether they are warnings or
/// hard failures is the caller's decision.
#[derive(Debug)]
pub struct ScanReport {
    /// Matches grouped by volume, volumes in completion order.
    pub matches: Vec<MatchRecord>,
    /// Exactly one entry per failed volume.
    pub errors: Vec<ItemError>,
    pub skipped: Vec<SkippedVolume>,
    /// Volumes selected for the scan.
    pub total: u64,
    /// Volumes that signalled completion (matched, skipped or failed).
    pub completed: u64,
    /// At least one volume was cut short by cancellation.
    pub cancelled: bool,
    pub elapsed: Duration,
}
impl ScanReport {
    /// No volume failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.matches.iter().map(|m| m.size).sum()
    }
}
