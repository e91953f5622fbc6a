use crate::models::{MatchRecord, ScanReport, SkippedVolume};
use crate::scan::VolumeOutcome;
use crate::scan::error::{Error as ItemError, ErrorKind as ItemErrorKind};
use std::time::Duration;

/// Folds volume outcomes into a [`ScanReport`].
///
/// Owned by the single consumer of the pool's outcome stream, so no locking
/// is needed: workers hand their results over and never touch shared
/// collections.
#[derive(Debug, Default)]
pub struct Aggregator {
    matches: Vec<MatchRecord>,
    errors: Vec<ItemError>,
    skipped: Vec<SkippedVolume>,
    completed: u64,
    matched_volumes: u64,
    cancelled: bool,
}

impl Aggregator {
    pub fn push(&mut self, outcome: VolumeOutcome) {
        self.completed += 1;
        match outcome {
            VolumeOutcome::Matched { matches, .. } => {
                if !matches.is_empty() {
                    self.matched_volumes += 1;
                }
                self.matches.extend(matches);
            },
            VolumeOutcome::Skipped(skipped) => self.skipped.push(skipped),
            VolumeOutcome::Failed(err) => {
                self.cancelled |= matches!(&*err, ItemErrorKind::Cancelled(_));
                self.errors.push(err);
            },
        }
    }

    /// Outcomes received so far.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Volumes with at least one match.
    pub fn matched_volumes(&self) -> u64 {
        self.matched_volumes
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.matches.iter().map(|m| m.size).sum()
    }

    /// At least one volume was cut short by cancellation.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn finish(self, total: u64, elapsed: Duration) -> ScanReport {
        ScanReport {
            matches: self.matches,
            errors: self.errors,
            skipped: self.skipped,
            total,
            completed: self.completed,
            cancelled: self.cancelled,
            elapsed,
        }
    }
}
