//! # Status
//!
//! Computes the status a Migration should carry after a cycle and writes it
//! only when it differs from what is already stored. Writing an unchanged
//! status would trigger another watch event and another cycle.

use crate::controller::reconciler::engine::ObservedState;
use crate::controller::reconciler::store::{JobStore, StoreError};
use crate::controller::reconciler::view::MigrationView;
use crate::crd::{Condition, MigrationPhase, MigrationStatus};
use tracing::debug;

/// Status for `view` after observing `state`
///
/// `spec_hash` is the hash of the candidate Job. Returns `None` when the
/// stored status should be left alone.
#[must_use]
pub fn desired_status(
    view: &MigrationView,
    state: ObservedState,
    spec_hash: Option<&str>,
) -> Option<MigrationStatus> {
    let (phase, reason, message) = match state {
        ObservedState::Paused => (
            MigrationPhase::Paused,
            "Paused",
            "Reconciliation is paused by annotation".to_string(),
        ),
        ObservedState::Absent => (
            MigrationPhase::Pending,
            "JobSubmitted",
            format!("Submitted migration job {}", view.name),
        ),
        ObservedState::RunningCurrent => (
            MigrationPhase::Running,
            "JobRunning",
            format!("Migration job {} is running", view.name),
        ),
        ObservedState::SucceededEquivalent => (
            MigrationPhase::Succeeded,
            "MigrationSucceeded",
            format!("Migration job {} completed", view.name),
        ),
        ObservedState::SucceededDivergent => (
            MigrationPhase::Pending,
            "SpecChanged",
            "Spec changed since the last run, replacing the migration job".to_string(),
        ),
        ObservedState::FailedEquivalent | ObservedState::FailedDivergent => (
            MigrationPhase::Failed,
            "JobFailed",
            format!("Migration job {} failed, retrying", view.name),
        ),
        ObservedState::Indeterminate => return None,
    };

    let previous = view.status.as_ref();
    let last_succeeded_spec_hash = if state == ObservedState::SucceededEquivalent {
        spec_hash.map(str::to_string)
    } else {
        previous.and_then(|s| s.last_succeeded_spec_hash.clone())
    };

    Some(build_status(
        view,
        phase,
        reason,
        message,
        last_succeeded_spec_hash,
    ))
}

/// Status for a Migration whose spec failed validation
#[must_use]
pub fn invalid_status(view: &MigrationView, message: &str) -> MigrationStatus {
    build_status(
        view,
        MigrationPhase::Invalid,
        "InvalidSpec",
        message.to_string(),
        view.status
            .as_ref()
            .and_then(|s| s.last_succeeded_spec_hash.clone()),
    )
}

fn build_status(
    view: &MigrationView,
    phase: MigrationPhase,
    reason: &str,
    message: String,
    last_succeeded_spec_hash: Option<String>,
) -> MigrationStatus {
    let previous = view.status.as_ref();
    let ready = if phase.is_ready() { "True" } else { "False" };

    // Keep the transition time while the condition status is unchanged
    let last_transition_time = previous
        .and_then(MigrationStatus::ready_condition)
        .filter(|c| c.status == ready)
        .and_then(|c| c.last_transition_time.clone())
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    MigrationStatus {
        phase: Some(phase.to_string()),
        conditions: vec![Condition {
            r#type: "Ready".to_string(),
            status: ready.to_string(),
            last_transition_time: Some(last_transition_time),
            reason: Some(reason.to_string()),
            message: Some(message),
        }],
        observed_generation: Some(view.generation),
        job_name: Some(view.name.clone()),
        last_succeeded_spec_hash,
        last_reconcile_time: previous.and_then(|s| s.last_reconcile_time.clone()),
    }
}

/// Whether `desired` differs from `current` in anything but timestamps
#[must_use]
pub fn status_changed(current: Option<&MigrationStatus>, desired: &MigrationStatus) -> bool {
    let Some(current) = current else {
        return true;
    };
    without_timestamps(current) != without_timestamps(desired)
}

fn without_timestamps(status: &MigrationStatus) -> MigrationStatus {
    let mut status = status.clone();
    status.last_reconcile_time = None;
    for condition in &mut status.conditions {
        condition.last_transition_time = None;
    }
    status
}

/// Write `desired` when it differs from the stored status
///
/// Returns whether a write happened.
pub async fn sync_status(
    store: &dyn JobStore,
    view: &MigrationView,
    mut desired: MigrationStatus,
) -> Result<bool, StoreError> {
    if !status_changed(view.status.as_ref(), &desired) {
        debug!(
            resource = view.key().as_str(),
            phase = desired.phase.as_deref().unwrap_or_default(),
            "Skipping status update - status unchanged"
        );
        return Ok(false);
    }

    desired.last_reconcile_time = Some(chrono::Utc::now().to_rfc3339());
    store
        .patch_status(&view.namespace, &view.name, &desired)
        .await?;
    debug!(
        resource = view.key().as_str(),
        phase = desired.phase.as_deref().unwrap_or_default(),
        "Updated migration status"
    );
    Ok(true)
}
