//! Bounded parallel file search across every volume of a catalog.
//!
//! The scanner fans one search task out per [`Volume`](dsfind_catalog::Volume),
//! never running more than a configured number at once, and fans the results
//! back in to a single [`ScanReport`]. While the tasks run, a reporter polls a
//! shared [`ProgressTracker`] and feeds a [`ProgressSink`].
//!
//! The primary entry point is [`find_files`]. Callers that want to drive
//! their own UI can consume the [`scan`] event stream instead.

mod aggregate;
pub mod error;
mod job;
mod models;
mod progress;
mod reporter;
pub mod scan;

pub use crate::aggregate::Aggregator;
pub use crate::job::{ScanRequest, VolumeSelection, discover, find_files};
pub use crate::models::{MatchRecord, ScanReport, SkippedVolume};
pub use crate::progress::ProgressTracker;
pub use crate::reporter::{NullSink, ProgressSink, TracingSink, report_progress};
pub use crate::scan::error::{Error as ItemError, ErrorKind as ItemErrorKind};
pub use crate::scan::{ScanEvent, VolumeOutcome, scan, scan_volumes};
use dsfind_catalog::{CatalogHandle, SearchSpec};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Volumes searched at the same time unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 11;
/// How often the reporter samples progress.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);
/// How long an in-flight remote call may keep running after cancellation.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Shared, read-only state handed to every volume task.
pub struct ScanContext {
    pub catalog: CatalogHandle,
    pub spec: SearchSpec,
    /// Folder inside each volume to start searching from.
    pub prefix: PathBuf,
    pub concurrency: usize,
    pub grace_period: Duration,
    pub cancel: CancellationToken,
}
impl ScanContext {
    pub fn new(catalog: CatalogHandle, spec: SearchSpec) -> Self {
        Self {
            catalog,
            spec,
            prefix: PathBuf::new(),
            concurrency: DEFAULT_CONCURRENCY,
            grace_period: DEFAULT_GRACE_PERIOD,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
