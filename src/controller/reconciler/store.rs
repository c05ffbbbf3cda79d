//! # Job Store
//!
//! Reads and writes the cluster objects the reconciler works with.
//!
//! `JobStore` is the seam between the reconciliation cycle and the API
//! server: `KubeJobStore` talks to Kubernetes, tests use an in-memory store.
//! Every read goes to the API server so a cycle never acts on cached state.

use crate::constants::CONTROLLER_NAME;
use crate::crd::{Migration, MigrationStatus};
use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("conflicting write to {kind} {namespace}/{name}")]
    Conflict {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("{0} is missing metadata.namespace or metadata.name")]
    MissingIdentity(&'static str),
    #[error("Kubernetes API request failed: {0}")]
    Api(#[source] kube::Error),
}

impl StoreError {
    /// Classify a kube error for `kind` `namespace/name`
    #[must_use]
    pub fn from_kube(kind: &'static str, namespace: &str, name: &str, error: kube::Error) -> Self {
        match error {
            kube::Error::Api(ref api_err) if api_err.code == 404 => StoreError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ref api_err) if api_err.code == 409 => StoreError::Conflict {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            other => StoreError::Api(other),
        }
    }
}

/// Result of an idempotent create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A Job with the same name already existed; treated as success
    AlreadyExists,
}

/// Result of a propagation-aware delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing to delete; treated as success
    NotFound,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fresh read of a Migration; `None` when it no longer exists
    async fn get_migration(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Migration>, StoreError>;

    /// Fresh read of a Job; `None` when it does not exist
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, StoreError>;

    /// Create `job`, reporting `AlreadyExists` instead of failing on a name clash
    async fn create_job(&self, job: &Job) -> Result<CreateOutcome, StoreError>;

    /// Delete a Job together with its pods
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<DeleteOutcome, StoreError>;

    /// Replace the status subresource of a Migration
    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &MigrationStatus,
    ) -> Result<(), StoreError>;
}

/// `JobStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeJobStore {
    client: Client,
}

impl std::fmt::Debug for KubeJobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeJobStore").finish_non_exhaustive()
    }
}

impl KubeJobStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobStore for KubeJobStore {
    async fn get_migration(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Migration>, StoreError> {
        let api: Api<Migration> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube("Migration", namespace, name, e))
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, StoreError> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube("Job", namespace, name, e))
    }

    async fn create_job(&self, job: &Job) -> Result<CreateOutcome, StoreError> {
        let (Some(namespace), Some(name)) = (
            job.metadata.namespace.as_deref(),
            job.metadata.name.as_deref(),
        ) else {
            return Err(StoreError::MissingIdentity("Job"));
        };

        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let params = PostParams {
            field_manager: Some(CONTROLLER_NAME.to_string()),
            ..PostParams::default()
        };
        match api.create(&params, job).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                debug!(job.namespace = namespace, job.name = name, "job already exists");
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(StoreError::from_kube("Job", namespace, name, e)),
        }
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<DeleteOutcome, StoreError> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::background()).await {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(StoreError::from_kube("Job", namespace, name, e)),
        }
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &MigrationStatus,
    ) -> Result<(), StoreError> {
        let api: Api<Migration> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(
            name,
            &PatchParams::apply(CONTROLLER_NAME),
            &Patch::Merge(patch),
        )
        .await
        .map(|_| ())
        .map_err(|e| StoreError::from_kube("Migration", namespace, name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: String::new(),
            code,
        })
    }

    #[test]
    fn test_not_found_is_classified() {
        let err = StoreError::from_kube("Job", "shop", "orders", api_error(404));
        assert!(matches!(err, StoreError::NotFound { kind: "Job", .. }));
        assert_eq!(err.to_string(), "Job shop/orders not found");
    }

    #[test]
    fn test_conflict_is_classified() {
        let err = StoreError::from_kube("Migration", "shop", "orders", api_error(409));
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn test_other_errors_are_api_errors() {
        let err = StoreError::from_kube("Job", "shop", "orders", api_error(500));
        assert!(matches!(err, StoreError::Api(_)));
    }
}
