//! Classify errors into retry policies by matching their description.

use regex::Regex;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::retry::error::RetryConfigError;
use crate::retry::policy::RetryPolicy;

/// Render an error the way rules are matched against: the full cause chain,
/// `outer: inner: ...`.
pub fn describe(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}

/// A set of whole-string patterns mapped to one policy.
#[derive(Debug, Clone)]
pub struct RetryRule {
    patterns: Vec<Regex>,
    policy: RetryPolicy,
}

impl RetryRule {
    /// Patterns use `regex` syntax and must match the entire description.
    pub fn new<I, S>(patterns: I, policy: RetryPolicy) -> Result<Self, RetryConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(&format!("^(?:{})$", p)).map_err(|source| RetryConfigError::Pattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns, policy })
    }

    pub fn matches(&self, description: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(description))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

/// Ordered rules plus a fallback. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RetryLibrary {
    rules: Vec<RetryRule>,
    default_policy: RetryPolicy,
}

impl Default for RetryLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RetryLibrary {
    pub fn new(rules: Vec<RetryRule>, default_policy: RetryPolicy) -> Self {
        Self {
            rules,
            default_policy,
        }
    }

    /// Policy of the first rule matching the whole description, else the default.
    pub fn select(&self, description: &str) -> &RetryPolicy {
        self.rules
            .iter()
            .find(|rule| rule.matches(description))
            .map(RetryRule::policy)
            .unwrap_or(&self.default_policy)
    }

    /// [`select`](Self::select) over the rendered error chain.
    pub fn classify(&self, err: &anyhow::Error) -> &RetryPolicy {
        self.select(&describe(err))
    }

    pub fn default_policy(&self) -> &RetryPolicy {
        &self.default_policy
    }

    pub fn rules(&self) -> &[RetryRule] {
        &self.rules
    }

    /// Build from the `[retry]` config section, validating every policy and pattern.
    pub fn from_config(cfg: &RetryConfig) -> Result<Self, RetryConfigError> {
        let rules = cfg
            .rules
            .iter()
            .map(|rule| RetryRule::new(&rule.patterns, rule.policy.to_policy()?))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules, cfg.default.to_policy()?))
    }

    /// Library used when the config has no `[retry]` section.
    ///
    /// Permanent errors first, then throttling, then transient network errors.
    pub fn builtin() -> Self {
        let permanent = RetryRule::new(
            [r"(?is).*\b(40[134]|not found|permission denied|unauthori[sz]ed|forbidden)\b.*"],
            RetryPolicy::no_retry(),
        );
        let throttled = RetryRule::new(
            [r"(?is).*\b(429|too many requests|rate limit(ed)?|quota exceeded)\b.*"],
            RetryPolicy {
                max_attempts: 6,
                base_delay: Duration::from_secs(1),
                multiplier: 2.0,
                max_delay: Duration::from_secs(60),
                jitter: Some(Duration::from_millis(500)),
            },
        );
        let transient = RetryRule::new(
            [r"(?is).*\b(50[0234]|timed out|timeout|connection (reset|refused|aborted)|temporarily unavailable)\b.*"],
            RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_millis(500),
                multiplier: 2.0,
                max_delay: Duration::from_secs(30),
                jitter: Some(Duration::from_millis(250)),
            },
        );
        let rules = [permanent, throttled, transient]
            .into_iter()
            .filter_map(|rule| match rule {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::error!("built-in retry rule rejected: {}", e);
                    None
                }
            })
            .collect();
        Self::new(rules, RetryPolicy::default())
    }
}
