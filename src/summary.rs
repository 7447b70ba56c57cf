//! Run-wide outcome counters.
//!
//! A [`RunSummary`] is shared by every worker; each counter is atomic, so
//! the totals are exact in both sequential and parallel mode.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::job::JobState;

#[derive(Debug, Default)]
pub struct RunSummary {
    started: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    cancelled: AtomicUsize,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummarySnapshot {
    pub started: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a transition into `state`. Entering `Queued` is not counted.
    pub fn record(&self, state: JobState) {
        let counter = match state {
            JobState::Queued => return,
            JobState::Running => &self.started,
            JobState::Completed => &self.completed,
            JobState::Failed => &self.failed,
            JobState::Skipped => &self.skipped,
            JobState::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        SummarySnapshot {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

impl SummarySnapshot {
    /// Jobs that reached a terminal state.
    pub fn finished(&self) -> usize {
        self.completed + self.failed + self.skipped + self.cancelled
    }

    /// True when every job completed, or every job was skipped (which
    /// includes an empty run).
    pub fn all_succeeded(&self) -> bool {
        let finished = self.finished();
        self.completed == finished || self.skipped == finished
    }
}
