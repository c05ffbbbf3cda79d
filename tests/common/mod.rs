//! Shared fixtures for reconciliation tests
//!
//! `MemoryStore` stands in for the API server and `RecordingNotifier`
//! captures published events, so full cycles run without a cluster.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::{Job, JobCondition, JobStatus};
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::error::ErrorResponse;
use migration_controller::config::ControllerConfig;
use migration_controller::controller::reconciler::{
    CreateOutcome, DeleteOutcome, JobStore, Notification, Notifier, Reconciler, StoreError,
};
use migration_controller::crd::{Migration, MigrationSpec, MigrationStatus, PAUSED_ANNOTATION};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = "shop";
pub const NAME: &str = "orders";

const SPEC_YAML: &str = r#"
database:
  username: orders
  credentials:
    name: orders-db
    key: password
  jdbcUrl: jdbc:postgresql://orders-db:5432/orders
flywayConfiguration:
  commands: ["info", "migrate", "info"]
  defaultSchema: orders
migrationSource:
  imageRef: registry.local/orders-sql:1.0.0
  path: /sql
"#;

/// A valid Migration `shop/orders` at generation 1
pub fn migration() -> Migration {
    let spec: MigrationSpec = serde_yaml::from_str(SPEC_YAML).expect("fixture spec parses");
    let mut migration = Migration::new(NAME, spec);
    migration.metadata.namespace = Some(NAMESPACE.to_string());
    migration.metadata.uid = Some("0b7d9c52-1111-4222-8333-444455556666".to_string());
    migration.metadata.generation = Some(1);
    migration
}

pub fn paused(mut migration: Migration) -> Migration {
    migration
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(PAUSED_ANNOTATION.to_string(), "true".to_string());
    migration
}

pub fn unpaused(mut migration: Migration) -> Migration {
    if let Some(annotations) = migration.metadata.annotations.as_mut() {
        annotations.remove(PAUSED_ANNOTATION);
    }
    migration
}

/// Simulate a spec edit: change the SQL image and bump the generation
pub fn with_new_source_image(mut migration: Migration, image: &str) -> Migration {
    migration.spec.migration_source.image_ref = image.to_string();
    migration.metadata.generation = Some(migration.metadata.generation.unwrap_or(0) + 1);
    migration
}

pub fn deleting(mut migration: Migration) -> Migration {
    let deleted_at: Time =
        serde_json::from_value(serde_json::json!("2026-03-01T12:00:00Z")).expect("valid timestamp");
    migration.metadata.deletion_timestamp = Some(deleted_at);
    migration
        .metadata
        .finalizers
        .get_or_insert_with(Vec::new)
        .push("example.com/keep".to_string());
    migration
}

fn finish(job: &mut Job, condition: &str, succeeded: Option<i32>, failed: Option<i32>) {
    job.status = Some(JobStatus {
        conditions: Some(vec![JobCondition {
            type_: condition.to_string(),
            status: "True".to_string(),
            ..JobCondition::default()
        }]),
        succeeded,
        failed,
        ..JobStatus::default()
    });
}

pub fn mark_running(job: &mut Job) {
    job.status = Some(JobStatus {
        active: Some(1),
        ..JobStatus::default()
    });
}

pub fn mark_succeeded(job: &mut Job) {
    finish(job, "Complete", Some(1), None);
}

pub fn mark_failed(job: &mut Job) {
    finish(job, "Failed", None, Some(1));
}

/// Terminal condition without any pod counters
pub fn mark_indeterminate(job: &mut Job) {
    finish(job, "Complete", None, None);
}

/// Error returned by injected failures
pub fn transient_error() -> StoreError {
    StoreError::Api(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: "etcdserver: request timed out".to_string(),
        reason: "Timeout".to_string(),
        code: 504,
    }))
}

/// Which store operations fail on their next calls
#[derive(Debug, Default, Clone, Copy)]
pub struct Failures {
    pub get_migration: bool,
    pub get_job: bool,
    pub create_job: bool,
    pub delete_job: bool,
    pub patch_status: bool,
}

/// Mutating calls seen by the store, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    CreateJob(String),
    DeleteJob(String),
    PatchStatus(String),
}

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// In-memory `JobStore`
#[derive(Debug, Default)]
pub struct MemoryStore {
    migrations: Mutex<HashMap<String, Migration>>,
    jobs: Mutex<HashMap<String, Job>>,
    failures: Mutex<Failures>,
    /// Reads of the Job return `None` while this is set, as a lagging cache would
    stale_job_reads: Mutex<bool>,
    /// The Job is removed by someone else just before our delete reaches it
    vanish_before_delete: Mutex<bool>,
    /// Deleted Jobs stay visible, as a Job still terminating would
    linger_after_delete: Mutex<bool>,
    calls: Mutex<Vec<StoreCall>>,
}

impl MemoryStore {
    pub fn with_migration(migration: Migration) -> Arc<Self> {
        let store = Arc::new(Self::default());
        store.put_migration(migration);
        store
    }

    /// Insert or replace a Migration, keeping any status the store already holds
    pub fn put_migration(&self, mut migration: Migration) {
        let k = key(
            migration.metadata.namespace.as_deref().unwrap_or_default(),
            migration.metadata.name.as_deref().unwrap_or_default(),
        );
        let mut migrations = self.migrations.lock().unwrap();
        if migration.status.is_none() {
            migration.status = migrations.get(&k).and_then(|m| m.status.clone());
        }
        migrations.insert(k, migration);
    }

    pub fn remove_migration(&self) {
        self.migrations.lock().unwrap().remove(&key(NAMESPACE, NAME));
    }

    pub fn migration(&self) -> Option<Migration> {
        self.migrations.lock().unwrap().get(&key(NAMESPACE, NAME)).cloned()
    }

    pub fn status(&self) -> Option<MigrationStatus> {
        self.migration().and_then(|m| m.status)
    }

    pub fn phase(&self) -> Option<String> {
        self.status().and_then(|s| s.phase)
    }

    pub fn job(&self) -> Option<Job> {
        self.jobs.lock().unwrap().get(&key(NAMESPACE, NAME)).cloned()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn put_job(&self, job: Job) {
        let k = key(
            job.metadata.namespace.as_deref().unwrap_or_default(),
            job.metadata.name.as_deref().unwrap_or_default(),
        );
        self.jobs.lock().unwrap().insert(k, job);
    }

    /// Apply `f` to the stored Job, as the Job controller would
    pub fn update_job(&self, f: impl FnOnce(&mut Job)) {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&key(NAMESPACE, NAME))
            .expect("job exists before update");
        f(job);
    }

    pub fn fail(&self, failures: Failures) {
        *self.failures.lock().unwrap() = failures;
    }

    pub fn heal(&self) {
        *self.failures.lock().unwrap() = Failures::default();
    }

    pub fn set_stale_job_reads(&self, stale: bool) {
        *self.stale_job_reads.lock().unwrap() = stale;
    }

    pub fn set_vanish_before_delete(&self, vanish: bool) {
        *self.vanish_before_delete.lock().unwrap() = vanish;
    }

    pub fn set_linger_after_delete(&self, linger: bool) {
        *self.linger_after_delete.lock().unwrap() = linger;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn mutating_job_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, StoreCall::PatchStatus(_)))
            .collect()
    }

    fn failures(&self) -> Failures {
        *self.failures.lock().unwrap()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn get_migration(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Migration>, StoreError> {
        if self.failures().get_migration {
            return Err(transient_error());
        }
        Ok(self.migrations.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, StoreError> {
        if self.failures().get_job {
            return Err(transient_error());
        }
        if *self.stale_job_reads.lock().unwrap() {
            return Ok(None);
        }
        Ok(self.jobs.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn create_job(&self, job: &Job) -> Result<CreateOutcome, StoreError> {
        let name = job.metadata.name.clone().unwrap_or_default();
        self.record(StoreCall::CreateJob(name.clone()));
        if self.failures().create_job {
            return Err(transient_error());
        }
        let namespace = job.metadata.namespace.as_deref().unwrap_or_default();
        let mut jobs = self.jobs.lock().unwrap();
        let k = key(namespace, &name);
        if jobs.contains_key(&k) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        jobs.insert(k, job.clone());
        Ok(CreateOutcome::Created)
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<DeleteOutcome, StoreError> {
        self.record(StoreCall::DeleteJob(name.to_string()));
        if self.failures().delete_job {
            return Err(transient_error());
        }
        let k = key(namespace, name);
        let mut jobs = self.jobs.lock().unwrap();
        if *self.vanish_before_delete.lock().unwrap() {
            jobs.remove(&k);
            return Ok(DeleteOutcome::NotFound);
        }
        if *self.linger_after_delete.lock().unwrap() {
            return Ok(if jobs.contains_key(&k) {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::NotFound
            });
        }
        match jobs.remove(&k) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &MigrationStatus,
    ) -> Result<(), StoreError> {
        self.record(StoreCall::PatchStatus(name.to_string()));
        if self.failures().patch_status {
            return Err(transient_error());
        }
        let mut migrations = self.migrations.lock().unwrap();
        let migration = migrations
            .get_mut(&key(namespace, name))
            .ok_or_else(|| StoreError::NotFound {
                kind: "Migration",
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;
        migration.status = Some(status.clone());
        Ok(())
    }
}

/// Notifier that keeps every notification it is asked to publish
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<&'static str> {
        self.sent().iter().map(Notification::reason).collect()
    }

    pub fn count(&self, reason: &str) -> usize {
        self.reasons().into_iter().filter(|r| *r == reason).count()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, _target: &ObjectReference, notification: &Notification) {
        self.sent.lock().unwrap().push(notification.clone());
    }
}

/// Reconciler wired to in-memory collaborators
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new(migration: Migration) -> Self {
        Self::with_config(migration, ControllerConfig::default())
    }

    pub fn with_config(migration: Migration, config: ControllerConfig) -> Self {
        let store = MemoryStore::with_migration(migration);
        let notifier = Arc::new(RecordingNotifier::default());
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            config,
        ));
        Self {
            store,
            notifier,
            reconciler,
        }
    }

    pub fn key(&self) -> String {
        key(NAMESPACE, NAME)
    }
}
