//! Error types for the retry layer.

/// Terminal outcome of a retried operation.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// The selected policy allowed no further attempts.
    #[error("gave up after {attempts} attempt(s): {last:#}")]
    Exhausted { attempts: u32, last: anyhow::Error },
    /// The job was cancelled before or between attempts.
    #[error("cancelled while retrying")]
    Cancelled,
}

impl RetryError {
    /// The error of the last attempt, if any attempt ran.
    pub fn last_error(&self) -> Option<&anyhow::Error> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Cancelled => None,
        }
    }
}

/// Invalid retry configuration.
#[derive(Debug, thiserror::Error)]
pub enum RetryConfigError {
    #[error("invalid retry pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid retry policy: {0}")]
    Policy(String),
}
