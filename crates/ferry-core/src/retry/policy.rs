use rand::Rng;
use std::time::Duration;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with a cap and optional jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Growth factor applied per further attempt.
    pub multiplier: f64,
    /// Upper bound on backoff delay (before jitter).
    pub max_delay: Duration,
    /// Uniform random delay in `[0, jitter]` added to each backoff.
    pub jitter: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: None,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, never retried.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            jitter: None,
        }
    }

    /// Same delay between every attempt.
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
            jitter: None,
        }
    }

    /// Backoff before attempt `attempt + 1`: `base * multiplier^(attempt-1)`, capped.
    ///
    /// `attempt` is 1-based (1 = the attempt that just failed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exp);
        let cap = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= cap {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Whether another attempt is allowed after `attempt` failed, and after which delay.
    /// Deterministic: jitter is not applied.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff(attempt))
    }

    /// Like [`decide`](Self::decide), with jitter drawn from `rng`.
    pub fn decide_jittered<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> RetryDecision {
        match self.decide(attempt) {
            RetryDecision::RetryAfter(delay) => {
                let extra = match self.jitter {
                    Some(j) if !j.is_zero() => {
                        Duration::from_millis(rng.random_range(0..=j.as_millis() as u64))
                    }
                    _ => Duration::ZERO,
                };
                RetryDecision::RetryAfter(delay.saturating_add(extra))
            }
            RetryDecision::NoRetry => RetryDecision::NoRetry,
        }
    }
}
