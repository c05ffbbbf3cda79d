//! # Reconciliation Logic
//!
//! One reconciliation cycle for a Migration:
//!
//! 1. Re-read the Migration; stop if it is gone or being deleted
//! 2. Honour the pause annotation before anything else
//! 3. Validate the spec and build the candidate Job
//! 4. Read, classify and compare the observed Job
//! 5. Decide, execute, and write the status
//!
//! Errors surface to the runtime through `ReconcileOutcome::into_result`.

use crate::controller::job::{classify, SpecHashComparator};
use crate::controller::reconciler::engine::{decide, ObservedState, PlannedOutcome};
use crate::controller::reconciler::executor::ActionExecutor;
use crate::controller::reconciler::notify::Notification;
use crate::controller::reconciler::status::{desired_status, invalid_status, sync_status};
use crate::controller::reconciler::types::{ReconcileOutcome, Reconciler, ReconcilerError};
use crate::controller::reconciler::view::MigrationView;
use crate::crd::Migration;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Entry point for the controller runtime
pub async fn reconcile(
    migration: Arc<Migration>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    let name = migration.metadata.name.clone().unwrap_or_default();
    let namespace = migration.metadata.namespace.clone().unwrap_or_default();

    let span = tracing::info_span!(
        "controller.reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        resource.generation = migration.metadata.generation.unwrap_or(0),
    );

    let outcome = if name.is_empty() || namespace.is_empty() {
        ReconcileOutcome::Error(ReconcilerError::InvariantViolation(
            "watched migration has no name or namespace".to_string(),
        ))
    } else {
        reconcile_migration(&ctx, &namespace, &name)
            .instrument(span)
            .await
    };

    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    outcome.into_result()
}

/// Run one cycle for `namespace/name` and map it to an outcome
///
/// Retryable failures get the next delay from the per-Migration Fibonacci
/// backoff. Only a settled cycle resets it: while the Job started by the last
/// retry is still running the error count is kept, so repeated failures keep
/// backing off.
pub async fn reconcile_migration(
    ctx: &Reconciler,
    namespace: &str,
    name: &str,
) -> ReconcileOutcome {
    observability::metrics::increment_reconciliations();
    let key = format!("{namespace}/{name}");

    let outcome = match run_cycle(ctx, namespace, name).await {
        Ok(PlannedOutcome::Success) => {
            ctx.reset_backoff(&key);
            ReconcileOutcome::Success
        }
        Ok(PlannedOutcome::SuccessWithRequeue(after)) => {
            ReconcileOutcome::SuccessWithRequeue(after)
        }
        Ok(PlannedOutcome::Retryable(e)) => {
            ReconcileOutcome::ErrorWithRequeue(e, ctx.next_backoff(&key))
        }
        Ok(PlannedOutcome::Fatal(e)) => ReconcileOutcome::Error(e),
        Err(e) if e.is_retryable() => {
            ReconcileOutcome::ErrorWithRequeue(e, ctx.next_backoff(&key))
        }
        Err(e) => ReconcileOutcome::Error(e),
    };

    match &outcome {
        ReconcileOutcome::Success => debug!(resource = key.as_str(), "reconciliation.success"),
        ReconcileOutcome::SuccessWithRequeue(after) => debug!(
            resource = key.as_str(),
            requeue_after_secs = after.as_secs(),
            "reconciliation.success"
        ),
        ReconcileOutcome::ErrorWithRequeue(e, after) => warn!(
            resource = key.as_str(),
            error = %e,
            requeue_after_secs = after.as_secs(),
            error_count = ctx.error_count(&key),
            "reconciliation.retry"
        ),
        ReconcileOutcome::Error(e) => {
            error!(resource = key.as_str(), error = %e, "reconciliation.error");
        }
    }

    outcome
}

async fn run_cycle(
    ctx: &Reconciler,
    namespace: &str,
    name: &str,
) -> Result<PlannedOutcome, ReconcilerError> {
    // Always act on a fresh read, never on the watch cache
    let Some(migration) = ctx.store.get_migration(namespace, name).await? else {
        debug!("Migration no longer exists, nothing to reconcile");
        return Ok(PlannedOutcome::Success);
    };
    let view = MigrationView::parse(&migration)?;

    if view.deleting {
        info!(resource = view.key().as_str(), "Migration is being deleted");
        ctx.notifier
            .notify(&view.object_ref, &Notification::Deleting)
            .await;
        return Ok(PlannedOutcome::Success);
    }

    if view.paused {
        let decision = decide(
            ObservedState::Paused,
            &view.name,
            ctx.config.job_running_requeue_duration(),
        );
        info!(
            resource = view.key().as_str(),
            "Reconciliation paused - skipping job actions"
        );
        record_decision_metrics(decision.state, decision.action.as_str());
        if let Some(status) = desired_status(&view, decision.state, None) {
            sync_status(ctx.store.as_ref(), &view, status).await?;
        }
        return Ok(decision.outcome);
    }

    if let Err(e) = view.validate() {
        warn!(resource = view.key().as_str(), error = %e, "Validation error");
        let message = e.to_string();
        // Only announce a newly detected problem, not every retry of it
        if sync_status(ctx.store.as_ref(), &view, invalid_status(&view, &message)).await? {
            ctx.notifier
                .notify(&view.object_ref, &Notification::InvalidSpec { message })
                .await;
        }
        return Err(e.into());
    }

    let candidate = ctx.builder.build(&view)?;
    let observed = ctx.store.get_job(namespace, name).await?;
    let lifecycle = classify(observed.as_ref());
    let equivalent = observed
        .as_ref()
        .map(|job| ctx.comparator.equivalent(&candidate, job));
    let state = ObservedState::observe(false, lifecycle, equivalent);
    let decision = decide(
        state,
        &view.name,
        ctx.config.job_running_requeue_duration(),
    );

    info!(
        resource = view.key().as_str(),
        lifecycle = lifecycle.as_str(),
        equivalent = ?equivalent,
        state = decision.state.as_str(),
        action = decision.action.as_str(),
        "reconciliation.decision"
    );
    record_decision_metrics(decision.state, decision.action.as_str());

    ActionExecutor::new(ctx.store.as_ref(), ctx.notifier.as_ref())
        .execute(&decision, &view, &candidate)
        .await?;

    let spec_hash = SpecHashComparator::marker(&candidate);
    if let Some(status) = desired_status(&view, state, spec_hash) {
        let first_success = state == ObservedState::SucceededEquivalent
            && view
                .status
                .as_ref()
                .and_then(|s| s.last_succeeded_spec_hash.as_deref())
                != spec_hash;

        sync_status(ctx.store.as_ref(), &view, status).await?;

        // Published after the status write so a failed write cannot lose it
        if first_success {
            info!(resource = view.key().as_str(), "Migration succeeded");
            ctx.notifier
                .notify(
                    &view.object_ref,
                    &Notification::Succeeded {
                        job: view.name.clone(),
                    },
                )
                .await;
        }
    }

    Ok(decision.outcome)
}

fn record_decision_metrics(state: ObservedState, action: &str) {
    observability::metrics::increment_observed_state(state.as_str());
    observability::metrics::increment_actions(action);
}
