use crate::retry::RetryError;
use crate::types::JobId;

/// Job-level failure of a copy. Item-level failures are reported through the
/// returned error list instead.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// Export failed after all retries; nothing safe is left to do.
    #[error("job {job_id}: error happened during export of {location}")]
    Export {
        job_id: JobId,
        location: String,
        #[source]
        source: RetryError,
    },
    /// The job's cancellation token fired.
    #[error("job {job_id}: copy cancelled")]
    Cancelled { job_id: JobId },
}

impl CopyError {
    pub fn job_id(&self) -> JobId {
        match self {
            CopyError::Export { job_id, .. } | CopyError::Cancelled { job_id } => *job_id,
        }
    }
}
