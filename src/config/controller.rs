//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use super::{env_var_opt, env_var_or_default, env_var_or_default_str};
use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_FLYWAY_IMAGE,
    DEFAULT_JOB_RUNNING_REQUEUE_SECS, DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
    DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Requeue interval after a non-retryable reconciliation error (seconds)
    pub reconciliation_error_requeue_secs: u64,
    /// Requeue interval while a migration Job is still running (seconds)
    pub job_running_requeue_secs: u64,
    /// Fibonacci backoff minimum for retryable errors (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff maximum for retryable errors (seconds)
    pub backoff_max_secs: u64,
    /// Delay before restarting the watch stream after it ends (seconds)
    pub watch_restart_delay_secs: u64,
    /// Namespace to watch; all namespaces when `None`
    pub watch_namespace: Option<String>,
    /// Flyway image used when a Migration does not name one
    pub default_flyway_image: String,
    /// Maximum concurrent reconciliations across different Migrations
    pub max_concurrent_reconciliations: u16,
    /// Log format (json, text)
    pub log_format: LogFormat,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            job_running_requeue_secs: DEFAULT_JOB_RUNNING_REQUEUE_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_namespace: None,
            default_flyway_image: DEFAULT_FLYWAY_IMAGE.to_string(),
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            log_format: LogFormat::Text,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let backoff_min_secs = env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS);
        // A maximum below the minimum would make the sequence shrink
        let backoff_max_secs =
            env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS).max(backoff_min_secs);

        Self {
            reconciliation_error_requeue_secs: env_var_or_default(
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            job_running_requeue_secs: env_var_or_default(
                "JOB_RUNNING_REQUEUE_SECS",
                DEFAULT_JOB_RUNNING_REQUEUE_SECS,
            )
            .max(1),
            backoff_min_secs,
            backoff_max_secs,
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_namespace: env_var_opt("WATCH_NAMESPACE"),
            default_flyway_image: env_var_or_default_str("FLYWAY_IMAGE", DEFAULT_FLYWAY_IMAGE),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            log_format: LogFormat::parse(&env_var_or_default_str("LOG_FORMAT", "text")),
        }
    }

    /// Get reconciliation error requeue duration
    #[must_use]
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    /// Get requeue duration used while a Job is running
    #[must_use]
    pub fn job_running_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.job_running_requeue_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}
