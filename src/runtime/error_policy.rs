//! # Error Policy
//!
//! Turns a failed reconciliation into a requeue.
//!
//! Retryable errors arrive wrapped in `ReconcilerError::Requeue` with the
//! Fibonacci delay already chosen by the reconciler. Everything else waits
//! for the configured error requeue interval.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::Migration;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

pub fn handle_reconciliation_error(
    obj: Arc<Migration>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::error_span!(
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {}", namespace, name, error);
    observability::metrics::increment_reconciliation_errors(error.reason());

    let (after, trigger) = match error.requeue_after() {
        Some(after) => (after, "error-backoff"),
        None => (ctx.config.reconciliation_error_requeue_duration(), "error"),
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(after).unwrap_or_else(|_| chrono::Duration::zero());
    info!(
        "Next retry scheduled: {} (in {}s, trigger source: {})",
        next_trigger_time.to_rfc3339(),
        after.as_secs(),
        trigger
    );

    observability::metrics::increment_requeues_total(trigger);
    Action::requeue(after)
}
