use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{JobId, JobMetadata};

/// Per-job state shared by every step of one copy.
#[derive(Debug)]
pub struct JobContext {
    job_id: JobId,
    metadata: JobMetadata,
    iterations: AtomicU64,
}

impl JobContext {
    pub fn new(job_id: JobId, metadata: JobMetadata) -> Self {
        Self {
            job_id,
            metadata,
            iterations: AtomicU64::new(0),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn metadata(&self) -> &JobMetadata {
        &self.metadata
    }

    /// Count one more export/import iteration; returns the new count.
    pub fn next_iteration(&self) -> u64 {
        self.iterations.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }
}
