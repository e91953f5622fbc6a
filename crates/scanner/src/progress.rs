use std::sync::atomic::{AtomicU64, Ordering};

/// Counts down outstanding volumes.
///
/// Every volume task decrements the counter exactly once, whether it matched,
/// was skipped or failed. Decrements saturate at zero, so a stray extra
/// completion can never wrap the counter or push progress above 100%.
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    remaining: AtomicU64,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self { total, remaining: AtomicU64::new(total) }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> u64 {
        self.total - self.remaining()
    }

    /// Mark one volume as done. Returns `false` if nothing was outstanding.
    pub fn complete_one(&self) -> bool {
        self.remaining.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1)).is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Completion percentage rounded to two decimals. An empty scan is
    /// complete by definition.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        let done = self.completed() as f64 / self.total as f64 * 100.0;
        (done * 100.0).round() / 100.0
    }
}
