//! Retry loop: run an async operation until success or the selected policy says stop.

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::classify::{describe, RetryLibrary};
use super::clock::Clock;
use super::error::RetryError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs fallible operations under a retry policy.
///
/// The policy is picked per failure from the library unless the caller fixes
/// it. Cancellation is checked before every attempt and raced against every
/// backoff wait.
#[derive(Clone)]
pub struct RetryingInvoker {
    library: Arc<RetryLibrary>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl RetryingInvoker {
    pub fn new(library: Arc<RetryLibrary>, clock: Arc<dyn Clock>, cancel: CancellationToken) -> Self {
        Self {
            library,
            clock,
            cancel,
        }
    }

    pub fn library(&self) -> &RetryLibrary {
        &self.library
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `op`, classifying each failure through the retry library.
    pub async fn invoke<T, F, Fut>(&self, what: &str, op: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.run(what, None, op).await
    }

    /// Run `op` under a caller-chosen policy.
    pub async fn invoke_with_policy<T, F, Fut>(
        &self,
        what: &str,
        policy: &RetryPolicy,
        op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.run(what, Some(policy), op).await
    }

    async fn run<T, F, Fut>(
        &self,
        what: &str,
        fixed: Option<&RetryPolicy>,
        mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 1u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }
            let started = self.clock.now();
            let err = match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(what, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };
            let took = self.clock.now().saturating_duration_since(started);
            let policy = fixed.unwrap_or_else(|| self.library.classify(&err));
            let decision = policy.decide_jittered(attempt, &mut rand::rng());
            match decision {
                RetryDecision::NoRetry => {
                    tracing::debug!(
                        what,
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %describe(&err),
                        "giving up"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        what,
                        attempt,
                        max_attempts = policy.max_attempts,
                        took_ms = took.as_millis() as u64,
                        delay_ms = delay.as_millis() as u64,
                        error = %describe(&err),
                        "attempt failed, retrying"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(RetryError::Cancelled),
                        _ = self.clock.sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}
