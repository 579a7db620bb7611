//! Scheduler configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{DuplicatePolicy, SchedulerLimits};

/// Environment variable for `max_concurrent`.
pub const ENV_MAX_CONCURRENT: &str = "SYNC_MAX_CONCURRENT";
/// Environment variable for `max_queue_depth`.
pub const ENV_MAX_QUEUE_DEPTH: &str = "SYNC_MAX_QUEUE_DEPTH";
/// Environment variable for `job_timeout_secs`.
pub const ENV_JOB_TIMEOUT_SECS: &str = "SYNC_JOB_TIMEOUT_SECS";
/// Environment variable for `duplicate_policy`.
pub const ENV_DUPLICATE_POLICY: &str = "SYNC_DUPLICATE_POLICY";

/// Largest accepted `job_timeout_secs`: one day.
pub const MAX_JOB_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum jobs executing at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Maximum queued jobs before rejection.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
    /// Job deadline in seconds; 0 disables it.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
    /// Handling of jobs for an already scheduled connection.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

const fn default_max_concurrent() -> usize {
    SchedulerLimits::DEFAULT_MAX_CONCURRENT
}

const fn default_max_queue_depth() -> usize {
    SchedulerLimits::DEFAULT_MAX_QUEUE_DEPTH
}

const fn default_job_timeout_secs() -> u64 {
    SchedulerLimits::DEFAULT_JOB_TIMEOUT.as_secs()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_queue_depth: default_max_queue_depth(),
            job_timeout_secs: default_job_timeout_secs(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.job_timeout_secs > MAX_JOB_TIMEOUT_SECS {
            return Err(format!(
                "job_timeout_secs must be at most {MAX_JOB_TIMEOUT_SECS}, got {}",
                self.job_timeout_secs
            ));
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Parse or validation failure message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the process environment, after reading a `.env` file if one
    /// exists. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Unparsable values or validation failure.
    pub fn from_env() -> Result<Self, String> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(format!(".env error: {e}"));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup using the `SYNC_*` variable names.
    ///
    /// # Errors
    ///
    /// Unparsable values or validation failure.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_MAX_CONCURRENT) {
            cfg.max_concurrent = parse_var(ENV_MAX_CONCURRENT, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_QUEUE_DEPTH) {
            cfg.max_queue_depth = parse_var(ENV_MAX_QUEUE_DEPTH, &v)?;
        }
        if let Some(v) = lookup(ENV_JOB_TIMEOUT_SECS) {
            cfg.job_timeout_secs = parse_var(ENV_JOB_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_DUPLICATE_POLICY) {
            cfg.duplicate_policy = match v.trim().to_ascii_lowercase().as_str() {
                "reject" => DuplicatePolicy::Reject,
                "coalesce" => DuplicatePolicy::Coalesce,
                "allow" => DuplicatePolicy::Allow,
                other => {
                    return Err(format!("{ENV_DUPLICATE_POLICY}: unknown policy `{other}`"))
                }
            };
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Job deadline, `None` when disabled.
    #[must_use]
    pub const fn job_timeout(&self) -> Option<Duration> {
        if self.job_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.job_timeout_secs))
        }
    }

    /// Runtime limits derived from this configuration.
    #[must_use]
    pub const fn limits(&self) -> SchedulerLimits {
        SchedulerLimits {
            max_concurrent: self.max_concurrent,
            max_queue_depth: self.max_queue_depth,
            job_timeout: self.job_timeout(),
            duplicate_policy: self.duplicate_policy,
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{key}: invalid value `{value}`: {e}"))
}
