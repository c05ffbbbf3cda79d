//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Name reported as field manager and event reporter
pub const CONTROLLER_NAME: &str = "flyway-migration-controller";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default requeue interval for non-retryable reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default requeue interval while a migration Job is still running (seconds)
pub const DEFAULT_JOB_RUNNING_REQUEUE_SECS: u64 = 5;

/// Default Fibonacci backoff minimum for retryable errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default Fibonacci backoff maximum for retryable errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting the watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default maximum number of concurrent reconciliations
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Flyway image used when neither the Migration nor `FLYWAY_IMAGE` names one
pub const DEFAULT_FLYWAY_IMAGE: &str = "docker.io/flyway/flyway:9";

/// `backoffLimit` of every migration Job
pub const JOB_BACKOFF_LIMIT: i32 = 2;
