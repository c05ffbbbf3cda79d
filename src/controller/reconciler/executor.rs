//! # Action Executor
//!
//! Carries out the action chosen by the engine against the `JobStore`.
//!
//! - `Create` is idempotent: a Job that already exists counts as created.
//! - `Replace` deletes the observed Job first and only creates the
//!   candidate once the delete succeeded or found nothing to delete.
//!   `JobReplaced` is published only once the replacement was created.
//! - `NoOp`, `Wait` and `ReportError` never touch the cluster.

use crate::controller::reconciler::engine::{Decision, JobAction, ObservedState};
use crate::controller::reconciler::notify::{Notification, Notifier};
use crate::controller::reconciler::store::{CreateOutcome, DeleteOutcome, JobStore};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::reconciler::view::MigrationView;
use crate::observability;
use k8s_openapi::api::batch::v1::Job;
use tracing::{debug, info, warn};

/// What the executor did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executed {
    Nothing,
    Created(CreateOutcome),
    Replaced {
        deleted: DeleteOutcome,
        created: CreateOutcome,
    },
}

pub struct ActionExecutor<'a> {
    store: &'a dyn JobStore,
    notifier: &'a dyn Notifier,
}

impl std::fmt::Debug for ActionExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor").finish_non_exhaustive()
    }
}

impl<'a> ActionExecutor<'a> {
    #[must_use]
    pub fn new(store: &'a dyn JobStore, notifier: &'a dyn Notifier) -> Self {
        Self { store, notifier }
    }

    /// Perform `decision.action` for `migration`
    ///
    /// `candidate` is the Job built from the current spec.
    pub async fn execute(
        &self,
        decision: &Decision,
        migration: &MigrationView,
        candidate: &Job,
    ) -> Result<Executed, ReconcilerError> {
        match decision.action {
            JobAction::NoOp | JobAction::Wait | JobAction::ReportError => {
                debug!(
                    resource = migration.key().as_str(),
                    action = decision.action.as_str(),
                    "no cluster changes"
                );
                Ok(Executed::Nothing)
            }
            JobAction::Create => self.create(migration, candidate).await.map(Executed::Created),
            JobAction::Replace => self.replace(decision.state, migration, candidate).await,
        }
    }

    async fn create(
        &self,
        migration: &MigrationView,
        candidate: &Job,
    ) -> Result<CreateOutcome, ReconcilerError> {
        let outcome = self.store.create_job(candidate).await?;
        self.announce_created(migration, outcome).await;
        Ok(outcome)
    }

    async fn announce_created(&self, migration: &MigrationView, outcome: CreateOutcome) {
        match outcome {
            CreateOutcome::Created => {
                info!(
                    resource = migration.key().as_str(),
                    job = migration.name.as_str(),
                    "Created migration job"
                );
                observability::metrics::increment_jobs_created();
                self.notifier
                    .notify(
                        &migration.object_ref,
                        &Notification::JobCreated {
                            job: migration.name.clone(),
                        },
                    )
                    .await;
            }
            // A lagging read or a Job still terminating after delete
            CreateOutcome::AlreadyExists => {
                debug!(
                    resource = migration.key().as_str(),
                    "Migration job already exists, nothing to create"
                );
            }
        }
    }

    async fn replace(
        &self,
        state: ObservedState,
        migration: &MigrationView,
        candidate: &Job,
    ) -> Result<Executed, ReconcilerError> {
        let deleted = match self
            .store
            .delete_job(&migration.namespace, &migration.name)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    resource = migration.key().as_str(),
                    error = %e,
                    "Failed to delete migration job, skipping create"
                );
                return Err(e.into());
            }
        };

        if deleted == DeleteOutcome::Deleted {
            observability::metrics::increment_jobs_deleted();
        }
        info!(
            resource = migration.key().as_str(),
            state = state.as_str(),
            deleted = ?deleted,
            "Replacing migration job"
        );

        let failed = matches!(
            state,
            ObservedState::FailedEquivalent | ObservedState::FailedDivergent
        );
        if failed {
            // The failure is reported even if the retry cannot be created
            self.notifier
                .notify(
                    &migration.object_ref,
                    &Notification::JobFailed {
                        job: migration.name.clone(),
                    },
                )
                .await;
        }

        let created = self.store.create_job(candidate).await?;
        if !failed && created == CreateOutcome::Created {
            self.notifier
                .notify(
                    &migration.object_ref,
                    &Notification::JobReplaced {
                        job: migration.name.clone(),
                    },
                )
                .await;
        }
        self.announce_created(migration, created).await;
        Ok(Executed::Replaced { deleted, created })
    }
}
