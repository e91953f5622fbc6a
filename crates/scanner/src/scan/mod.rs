//! Per-volume search tasks and the bounded pool that runs them.
//!
//! [`scan_volumes`] is the pool: it keeps at most
//! [`ScanContext::concurrency`](crate::ScanContext::concurrency) volume tasks
//! in flight and yields a [`VolumeOutcome`] for every volume it was given, in
//! completion order. [`scan`] wraps discovery and the pool into a single event
//! stream for callers that render their own progress.

pub mod error;
mod stream;
mod volume;

pub use self::stream::{ScanEvent, scan, scan_volumes};
pub use self::volume::VolumeOutcome;
