//! Controller configuration
//!
//! Defines the policy and tuning knobs read by the reconciliation pipeline:
//! the requester allow list, job retention behavior, and the bounds applied
//! to external calls.

use async_trait::async_trait;
use std::time::Duration;

/// Controller configuration
///
/// Reloaded at the start of every reconciliation so policy changes take
/// effect without a restart.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Requester identities allowed to run jobs. An empty list denies
    /// everything.
    pub allow_list: Vec<String>,

    /// When set, finished jobs are kept in the engine instead of deleted.
    pub keep_jobs: bool,

    /// How long a finished job is retained before cleanup.
    pub job_retention: Duration,

    /// Upper bound applied to every external call (config load, engine
    /// find/create/observe/delete).
    pub call_timeout: Duration,

    /// How often incomplete records are re-enqueued for reconciliation.
    pub resync_interval: Duration,

    /// Delay before a requeued trigger is redelivered.
    pub requeue_delay: Duration,
}

impl ControllerConfig {
    /// Creates a new configuration with defaults.
    pub fn new(allow_list: Vec<String>) -> Self {
        Self {
            allow_list,
            keep_jobs: false,
            job_retention: Duration::ZERO,
            call_timeout: Duration::from_secs(10),
            resync_interval: Duration::from_secs(15),
            requeue_delay: Duration::from_secs(5),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - DISPATCH_ALLOW_LIST (comma-separated requester identities)
    /// - DISPATCH_KEEP_JOBS (optional, "true"/"false", default: false)
    /// - DISPATCH_JOB_RETENTION (optional, seconds, default: 0)
    /// - DISPATCH_CALL_TIMEOUT (optional, seconds, default: 10)
    /// - DISPATCH_RESYNC_INTERVAL (optional, seconds, default: 15)
    /// - DISPATCH_REQUEUE_DELAY (optional, seconds, default: 5)
    pub fn from_env() -> anyhow::Result<Self> {
        let allow_list = std::env::var("DISPATCH_ALLOW_LIST")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let keep_jobs = std::env::var("DISPATCH_KEEP_JOBS")
            .ok()
            .map(|s| s == "true" || s == "1")
            .unwrap_or(false);

        let job_retention = env_seconds("DISPATCH_JOB_RETENTION", 0);
        let call_timeout = env_seconds("DISPATCH_CALL_TIMEOUT", 10);
        let resync_interval = env_seconds("DISPATCH_RESYNC_INTERVAL", 15);
        let requeue_delay = env_seconds("DISPATCH_REQUEUE_DELAY", 5);

        let config = Self {
            allow_list,
            keep_jobs,
            job_retention,
            call_timeout,
            resync_interval,
            requeue_delay,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.call_timeout.is_zero() {
            anyhow::bail!("call_timeout must be greater than 0");
        }

        if self.resync_interval.is_zero() {
            anyhow::bail!("resync_interval must be greater than 0");
        }

        if self.requeue_delay.is_zero() {
            anyhow::bail!("requeue_delay must be greater than 0");
        }

        if self.allow_list.iter().any(|r| r.is_empty()) {
            anyhow::bail!("allow_list entries cannot be empty");
        }

        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn env_seconds(var: &str, default: u64) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default))
}

/// Configuration source consulted once per reconciliation
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    async fn load(&self) -> anyhow::Result<ControllerConfig>;
}

/// Environment-backed configuration loader
pub struct EnvConfigLoader;

#[async_trait]
impl ConfigLoader for EnvConfigLoader {
    async fn load(&self) -> anyhow::Result<ControllerConfig> {
        ControllerConfig::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert!(config.allow_list.is_empty());
        assert!(!config.keep_jobs);
        assert_eq!(config.job_retention, Duration::ZERO);
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ControllerConfig::new(vec!["tenant-a".to_string()]);
        assert!(config.validate().is_ok());

        config.call_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.call_timeout = Duration::from_secs(10);
        config.allow_list.push(String::new());
        assert!(config.validate().is_err());
    }
}
