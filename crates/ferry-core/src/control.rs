//! Job control for cancellation: one cancellation token per running job.
//!
//! The runner registers each job before copying and passes the token to the
//! engine; a control client (the CLI's Ctrl-C handler) requests cancellation
//! and the engine stops at the next attempt or backoff wait.

use std::collections::HashMap;
use std::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::types::JobId;

/// Shared registry of job id -> cancellation token.
#[derive(Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<JobId, CancellationToken>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job and return the token to hand to its engine.
    pub fn register(&self, job_id: JobId) -> CancellationToken {
        let token = CancellationToken::new();
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job_id, token.clone());
        token
    }

    /// Unregister a job (call when the job finishes, success or failure).
    pub fn unregister(&self, job_id: JobId) {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&job_id);
    }

    /// Request cancellation of one job. Returns false if the job is not registered.
    pub fn request_cancel(&self, job_id: JobId) -> bool {
        match self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&job_id)
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every registered job; returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        for token in jobs.values() {
            token.cancel();
        }
        jobs.len()
    }

    pub fn running(&self) -> Vec<JobId> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect()
    }
}
