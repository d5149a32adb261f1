use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{RetryConfigError, RetryLibrary, RetryPolicy};

/// One retry policy as written in config.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Backoff growth factor per attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: f64,
    /// Optional random jitter bound in seconds added to each delay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter_secs: Option<f64>,
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            multiplier: 2.0,
            max_delay_secs: 30.0,
            jitter_secs: None,
        }
    }
}

impl RetryPolicyConfig {
    /// Validate and convert to a runtime policy.
    pub fn to_policy(&self) -> Result<RetryPolicy, RetryConfigError> {
        if self.max_attempts == 0 {
            return Err(RetryConfigError::Policy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(RetryConfigError::Policy(format!(
                "multiplier must be >= 1, got {}",
                self.multiplier
            )));
        }
        let base = secs(self.base_delay_secs, "base_delay_secs")?;
        let max = secs(self.max_delay_secs, "max_delay_secs")?;
        if base > max {
            return Err(RetryConfigError::Policy(format!(
                "base_delay_secs ({}) must not exceed max_delay_secs ({})",
                self.base_delay_secs, self.max_delay_secs
            )));
        }
        let jitter = self
            .jitter_secs
            .map(|j| secs(j, "jitter_secs"))
            .transpose()?;
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: base,
            multiplier: self.multiplier,
            max_delay: max,
            jitter,
        })
    }
}

fn secs(value: f64, field: &str) -> Result<Duration, RetryConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        RetryConfigError::Policy(format!(
            "{} must be a non-negative number of seconds within range, got {}",
            field, value
        ))
    })
}

/// Ordered rule: the first rule with a pattern matching the whole error wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryRuleConfig {
    pub patterns: Vec<String>,
    pub policy: RetryPolicyConfig,
}

/// Retry section of config.toml (optional; built-in rules apply if missing).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub default: RetryPolicyConfig,
    #[serde(default)]
    pub rules: Vec<RetryRuleConfig>,
}

/// What happens when exporting a container fails after all retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFailureMode {
    /// Stop the whole job.
    #[default]
    AbortJob,
    /// Record the failed container and continue with its siblings.
    /// The job's first export is still fatal.
    SkipContainer,
}

/// Global configuration loaded from `~/.config/ferry/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Items per page for the local directory exporter.
    pub page_size: usize,
    /// Policy for terminal export failures.
    #[serde(default)]
    pub export_failure: ExportFailureMode,
    /// Optional retry library; if missing, built-in rules are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            export_failure: ExportFailureMode::AbortJob,
            retry: None,
        }
    }
}

impl FerryConfig {
    /// Retry library from the `[retry]` section, or the built-in one.
    pub fn retry_library(&self) -> Result<RetryLibrary, RetryConfigError> {
        match &self.retry {
            Some(retry) => RetryLibrary::from_config(retry),
            None => Ok(RetryLibrary::builtin()),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ferry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FerryConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FerryConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<FerryConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: FerryConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = FerryConfig::default();
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.export_failure, ExportFailureMode::AbortJob);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            page_size = 10
            export_failure = "skip_container"
        "#;
        let cfg: FerryConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.export_failure, ExportFailureMode::SkipContainer);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_retry_rules() {
        let toml = r#"
            page_size = 25

            [retry.default]
            max_attempts = 3
            base_delay_secs = 0.5
            max_delay_secs = 15

            [[retry.rules]]
            patterns = ["timeout.*", ".*429.*"]
            [retry.rules.policy]
            max_attempts = 8
            base_delay_secs = 1
            multiplier = 3
            max_delay_secs = 60
            jitter_secs = 0.5
        "#;
        let cfg: FerryConfig = toml::from_str(toml).unwrap();
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.default.max_attempts, 3);
        assert!((retry.default.multiplier - 2.0).abs() < 1e-9);
        assert_eq!(retry.rules.len(), 1);
        assert_eq!(retry.rules[0].patterns, vec!["timeout.*", ".*429.*"]);
        let policy = retry.rules[0].policy.to_policy().unwrap();
        assert_eq!(policy.max_attempts, 8);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.jitter, Some(Duration::from_millis(500)));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let zero = RetryPolicyConfig {
            max_attempts: 0,
            ..RetryPolicyConfig::default()
        };
        assert!(zero.to_policy().is_err());

        let inverted = RetryPolicyConfig {
            base_delay_secs: 10.0,
            max_delay_secs: 1.0,
            ..RetryPolicyConfig::default()
        };
        assert!(inverted.to_policy().is_err());

        let shrinking = RetryPolicyConfig {
            multiplier: 0.5,
            ..RetryPolicyConfig::default()
        };
        assert!(shrinking.to_policy().is_err());

        let huge = RetryPolicyConfig {
            max_delay_secs: 1e20,
            ..RetryPolicyConfig::default()
        };
        assert!(matches!(huge.to_policy(), Err(RetryConfigError::Policy(_))));

        let negative = RetryPolicyConfig {
            jitter_secs: Some(-1.0),
            ..RetryPolicyConfig::default()
        };
        assert!(negative.to_policy().is_err());
    }

    #[test]
    fn out_of_range_delay_in_file_is_a_config_error() {
        let toml = r#"
            page_size = 5

            [retry.default]
            max_attempts = 3
            base_delay_secs = 1
            max_delay_secs = 1e20
        "#;
        let cfg: FerryConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            cfg.retry_library(),
            Err(RetryConfigError::Policy(_))
        ));
    }

    #[test]
    fn retry_library_falls_back_to_builtin() {
        let cfg = FerryConfig::default();
        let lib = cfg.retry_library().unwrap();
        assert_eq!(lib.rules().len(), RetryLibrary::builtin().rules().len());

        let bad = FerryConfig {
            retry: Some(RetryConfig {
                default: RetryPolicyConfig::default(),
                rules: vec![RetryRuleConfig {
                    patterns: vec!["(unclosed".to_string()],
                    policy: RetryPolicyConfig::default(),
                }],
            }),
            ..FerryConfig::default()
        };
        assert!(matches!(
            bad.retry_library(),
            Err(RetryConfigError::Pattern { .. })
        ));
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "page_size = 7\n").unwrap();
        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.page_size, 7);
        assert_eq!(cfg.export_failure, ExportFailureMode::AbortJob);
    }
}
