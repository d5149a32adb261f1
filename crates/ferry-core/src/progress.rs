//! Progress reporting for a running copy job.
//!
//! The engine sends a snapshot after every page; consumers print or aggregate it.

use std::time::Duration;

use crate::types::JobId;

/// Snapshot of one job's progress (CLI-friendly).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyProgress {
    pub job_id: Option<JobId>,
    /// Export calls that returned a page.
    pub pages_exported: u64,
    /// Import calls that completed without a page-level failure.
    pub pages_imported: u64,
    /// Distinct containers started (the root counts as one).
    pub containers_visited: u64,
    /// Item and page failures recorded so far.
    pub import_errors: usize,
    /// Tasks still queued.
    pub pending: usize,
    /// Time since the copy started (on the engine's clock).
    pub elapsed: Duration,
}

impl CopyProgress {
    /// Pages exported per second (0 if no time has elapsed).
    pub fn pages_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.pages_exported as f64 / secs
    }

    /// True once nothing is queued.
    pub fn is_drained(&self) -> bool {
        self.pending == 0
    }
}
