//! # Types
//!
//! Core types for the reconciler: the shared context, the error taxonomy and
//! the outcome of a reconciliation cycle.

use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffState;
use crate::controller::job::{BuildError, JobBuilder, JobComparator, SpecHashComparator};
use crate::controller::reconciler::notify::{EventNotifier, Notifier};
use crate::controller::reconciler::store::{KubeJobStore, JobStore, StoreError};
use crate::controller::reconciler::view::ValidationError;
use kube::Client;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Reading or writing cluster state failed; retryable
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    /// The Job ran and failed; a new attempt has been submitted
    #[error("migration job {job} failed")]
    ExecutionFailed { job: String },
    /// Observed state the decision table has no answer for
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("invalid migration: {0}")]
    InvalidSpec(#[from] ValidationError),
    #[error("failed to build migration job: {0}")]
    Build(#[from] BuildError),
    /// A retryable error carrying the delay chosen by the reconciler
    #[error("{source} (retrying in {}s)", after.as_secs())]
    Requeue {
        #[source]
        source: Box<ReconcilerError>,
        after: Duration,
    },
}

impl ReconcilerError {
    /// Whether retrying the same cycle can succeed without a spec change
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcilerError::Storage(_)
            | ReconcilerError::ExecutionFailed { .. }
            | ReconcilerError::Requeue { .. } => true,
            ReconcilerError::InvariantViolation(_)
            | ReconcilerError::InvalidSpec(_)
            | ReconcilerError::Build(_) => false,
        }
    }

    /// Delay chosen by the reconciler, if any
    #[must_use]
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            ReconcilerError::Requeue { after, .. } => Some(*after),
            _ => None,
        }
    }

    /// Short label for metrics
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Storage(_) => "storage",
            ReconcilerError::ExecutionFailed { .. } => "execution_failed",
            ReconcilerError::InvariantViolation(_) => "invariant_violation",
            ReconcilerError::InvalidSpec(_) => "invalid_spec",
            ReconcilerError::Build(_) => "build",
            ReconcilerError::Requeue { source, .. } => source.reason(),
        }
    }
}

/// Result of one reconciliation cycle
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Nothing left to do until something changes
    Success,
    /// Healthy, but look again after the delay
    SuccessWithRequeue(Duration),
    /// Fatal for this cycle
    Error(ReconcilerError),
    /// Retryable; try again after the delay
    ErrorWithRequeue(ReconcilerError, Duration),
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Success => "success",
            ReconcileOutcome::SuccessWithRequeue(_) => "success_with_requeue",
            ReconcileOutcome::Error(_) => "error",
            ReconcileOutcome::ErrorWithRequeue(..) => "error_with_requeue",
        }
    }

    /// Hand the outcome to the controller runtime
    ///
    /// Errors with a delay are wrapped in `ReconcilerError::Requeue` so the
    /// error policy can honour the delay.
    pub fn into_result(self) -> Result<Action, ReconcilerError> {
        match self {
            ReconcileOutcome::Success => Ok(Action::await_change()),
            ReconcileOutcome::SuccessWithRequeue(after) => Ok(Action::requeue(after)),
            ReconcileOutcome::Error(error) => Err(error),
            ReconcileOutcome::ErrorWithRequeue(error, after) => Err(ReconcilerError::Requeue {
                source: Box::new(error),
                after,
            }),
        }
    }
}

/// Shared reconciliation context
#[derive(Clone)]
pub struct Reconciler {
    pub store: Arc<dyn JobStore>,
    pub notifier: Arc<dyn Notifier>,
    pub comparator: Arc<dyn JobComparator>,
    pub builder: JobBuilder,
    pub config: ControllerConfig,
    /// Backoff state per Migration (keyed by namespace/name)
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("comparator", &self.comparator)
            .field("builder", &self.builder)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Context with the default comparator
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        notifier: Arc<dyn Notifier>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            comparator: Arc::new(SpecHashComparator),
            builder: JobBuilder::new(config.default_flyway_image.clone()),
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Context talking to the cluster behind `client`
    #[must_use]
    pub fn from_client(client: Client, config: ControllerConfig) -> Self {
        let instance = std::env::var("POD_NAME").ok();
        Self::new(
            Arc::new(KubeJobStore::new(client.clone())),
            Arc::new(EventNotifier::new(client, instance)),
            config,
        )
    }

    #[must_use]
    pub fn with_comparator(mut self, comparator: Arc<dyn JobComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    /// Advance the backoff of `key` and return the next delay
    pub fn next_backoff(&self, key: &str) -> Duration {
        match self.backoff_states.lock() {
            Ok(mut states) => states
                .entry(key.to_string())
                .or_insert_with(|| {
                    BackoffState::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
                })
                .record_error(),
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using minimum backoff", e);
                Duration::from_secs(self.config.backoff_min_secs.max(1))
            }
        }
    }

    /// Forget the backoff of `key` after a successful cycle
    pub fn reset_backoff(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(key);
        }
    }

    /// Consecutive retryable failures recorded for `key`
    #[must_use]
    pub fn error_count(&self, key: &str) -> u32 {
        self.backoff_states
            .lock()
            .ok()
            .and_then(|states| states.get(key).map(|s| s.error_count))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ReconcilerError::ExecutionFailed {
            job: "orders".to_string()
        }
        .is_retryable());
        assert!(!ReconcilerError::InvariantViolation("x".to_string()).is_retryable());
        assert!(!ReconcilerError::InvalidSpec(ValidationError::EmptyImageRef).is_retryable());
    }

    #[test]
    fn test_outcome_maps_to_actions() {
        assert_eq!(
            ReconcileOutcome::Success.into_result().unwrap(),
            Action::await_change()
        );
        assert_eq!(
            ReconcileOutcome::SuccessWithRequeue(Duration::from_secs(5))
                .into_result()
                .unwrap(),
            Action::requeue(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_error_with_requeue_carries_delay() {
        let err = ReconcileOutcome::ErrorWithRequeue(
            ReconcilerError::ExecutionFailed {
                job: "orders".to_string(),
            },
            Duration::from_secs(10),
        )
        .into_result()
        .unwrap_err();

        assert_eq!(err.requeue_after(), Some(Duration::from_secs(10)));
        assert_eq!(err.reason(), "execution_failed");
        assert_eq!(err.to_string(), "migration job orders failed (retrying in 10s)");
    }

    #[test]
    fn test_fatal_error_has_no_delay() {
        let err = ReconcileOutcome::Error(ReconcilerError::InvariantViolation("x".to_string()))
            .into_result()
            .unwrap_err();
        assert_eq!(err.requeue_after(), None);
    }
}
