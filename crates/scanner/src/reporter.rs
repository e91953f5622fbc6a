//! Periodic progress reporting.

use crate::progress::ProgressTracker;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Receives completion percentages while a scan runs.
///
/// Percentages arrive in non-decreasing order and the last one of a finished
/// scan is `100.0`. Any `Fn(f64)` closure is a sink.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, percent: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn on_progress(&self, percent: f64) {
        self(percent)
    }
}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;
impl ProgressSink for TracingSink {
    fn on_progress(&self, percent: f64) {
        tracing::info!(percent, "Search progress");
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;
impl ProgressSink for NullSink {
    fn on_progress(&self, _percent: f64) {}
}

/// Samples `tracker` every `interval` and forwards the percentage to `sink`
/// whenever it has gone up since the last emission.
///
/// Runs until `done` is cancelled, then emits one final value if anything
/// changed after the last tick. With nothing to track it emits `100.0` once
/// and returns straight away.
pub async fn report_progress(
    tracker: &ProgressTracker,
    sink: &dyn ProgressSink,
    interval: Duration,
    done: &CancellationToken,
) {
    if tracker.total() == 0 {
        sink.on_progress(100.0);
        return;
    }

    let mut last = 0.0;
    let mut emit = |sink: &dyn ProgressSink| {
        let percent = tracker.percent();
        if percent > last {
            last = percent;
            sink.on_progress(percent);
        }
    };

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            () = done.cancelled() => break,
            _ = ticker.tick() => emit(sink),
        }
    }
    emit(sink);
}
