//! # Job Builder
//!
//! Renders the Kubernetes Job for a Migration.
//!
//! The Job runs two containers sharing an `emptyDir` volume:
//! - `copy-sql` (init) copies the SQL files out of the migration source image
//! - `flyway` runs the configured Flyway commands against the database
//!
//! The builder is a pure function of the Migration and the controller's
//! default Flyway image. It stamps the pod template's content hash on the Job
//! so that later cycles can tell whether the Job is still current.

use crate::constants::{CONTROLLER_NAME, JOB_BACKOFF_LIMIT};
use crate::controller::job::compare::spec_hash;
use crate::controller::reconciler::view::MigrationView;
use crate::crd::{EnvVarSpec, SecretKeyRef, GENERATION_ANNOTATION, SPEC_HASH_ANNOTATION};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, EnvVar, EnvVarSource, LocalObjectReference, PodSpec,
    PodTemplateSpec, SecretKeySelector, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use thiserror::Error;

const SQL_VOLUME_NAME: &str = "sql";
const COPY_TARGET_PATH: &str = "/mnt/target/";
const FLYWAY_SQL_PATH: &str = "/flyway/sql";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to hash pod template: {0}")]
    Hash(#[from] serde_json::Error),
}

/// Builds migration Jobs
#[derive(Debug, Clone)]
pub struct JobBuilder {
    default_flyway_image: String,
}

impl JobBuilder {
    #[must_use]
    pub fn new(default_flyway_image: impl Into<String>) -> Self {
        Self {
            default_flyway_image: default_flyway_image.into(),
        }
    }

    /// Render the Job required by `migration`
    ///
    /// The Job carries the Migration's namespace and name, a controller owner
    /// reference back to the Migration, and the `spec-hash` annotation.
    pub fn build(&self, migration: &MigrationView) -> Result<Job, BuildError> {
        let template = self.pod_template(migration);
        let hash = spec_hash(&template)?;

        let labels = BTreeMap::from([
            (
                "app.kubernetes.io/managed-by".to_string(),
                CONTROLLER_NAME.to_string(),
            ),
            ("app.kubernetes.io/name".to_string(), "flyway".to_string()),
            (
                "app.kubernetes.io/instance".to_string(),
                migration.name.clone(),
            ),
        ]);
        let annotations = BTreeMap::from([
            (SPEC_HASH_ANNOTATION.to_string(), hash),
            (
                GENERATION_ANNOTATION.to_string(),
                migration.generation.to_string(),
            ),
        ]);

        Ok(Job {
            metadata: ObjectMeta {
                name: Some(migration.name.clone()),
                namespace: Some(migration.namespace.clone()),
                labels: Some(labels),
                annotations: Some(annotations),
                owner_references: migration.owner_reference.clone().map(|r| vec![r]),
                ..ObjectMeta::default()
            },
            spec: Some(JobSpec {
                backoff_limit: Some(JOB_BACKOFF_LIMIT),
                template,
                ..JobSpec::default()
            }),
            ..Job::default()
        })
    }

    /// Flyway image for `migration`, falling back to the controller default
    #[must_use]
    pub fn flyway_image(&self, migration: &MigrationView) -> String {
        migration
            .spec
            .flyway_configuration
            .flyway_image
            .as_deref()
            .map(str::trim)
            .filter(|image| !image.is_empty())
            .unwrap_or(&self.default_flyway_image)
            .to_string()
    }

    fn pod_template(&self, migration: &MigrationView) -> PodTemplateSpec {
        let source = &migration.spec.migration_source;

        let copy_sql = Container {
            name: "copy-sql".to_string(),
            image: Some(source.image_ref.clone()),
            image_pull_policy: Some("Always".to_string()),
            command: Some(vec!["sh".to_string(), "-c".to_string()]),
            args: Some(vec![format!(
                "cd {} && cp -rp * {}",
                source.path, COPY_TARGET_PATH
            )]),
            volume_mounts: Some(vec![VolumeMount {
                name: SQL_VOLUME_NAME.to_string(),
                mount_path: COPY_TARGET_PATH.to_string(),
                ..VolumeMount::default()
            }]),
            ..Container::default()
        };

        let flyway = Container {
            name: "flyway".to_string(),
            image: Some(self.flyway_image(migration)),
            image_pull_policy: Some("Always".to_string()),
            args: Some(flyway_args(migration)),
            env: Some(flyway_env(migration)),
            volume_mounts: Some(vec![VolumeMount {
                name: SQL_VOLUME_NAME.to_string(),
                mount_path: FLYWAY_SQL_PATH.to_string(),
                ..VolumeMount::default()
            }]),
            ..Container::default()
        };

        let image_pull_secrets = (!source.image_pull_secrets.is_empty()).then(|| {
            source
                .image_pull_secrets
                .iter()
                .map(|s| LocalObjectReference {
                    name: s.name.clone(),
                })
                .collect()
        });

        PodTemplateSpec {
            metadata: None,
            spec: Some(PodSpec {
                init_containers: Some(vec![copy_sql]),
                containers: vec![flyway],
                volumes: Some(vec![Volume {
                    name: SQL_VOLUME_NAME.to_string(),
                    empty_dir: Some(EmptyDirVolumeSource::default()),
                    ..Volume::default()
                }]),
                image_pull_secrets,
                restart_policy: Some("Never".to_string()),
                ..PodSpec::default()
            }),
        }
    }
}

fn flyway_args(migration: &MigrationView) -> Vec<String> {
    let mut args = migration.spec.flyway_configuration.commands.clone();
    args.push("-outputType=json".to_string());
    args
}

fn flyway_env(migration: &MigrationView) -> Vec<EnvVar> {
    let database = &migration.spec.database;
    let flyway = &migration.spec.flyway_configuration;
    let source = &migration.spec.migration_source;

    let mut env = vec![
        plain_env("FLYWAY_USER", &database.username),
        secret_env("FLYWAY_PASSWORD", &database.credentials),
        plain_env("FLYWAY_URL", &database.jdbc_url),
        plain_env("FLYWAY_ENCODING", &source.encoding),
    ];

    if let Some(baseline) = flyway.baseline_on_migrate {
        env.push(plain_env("FLYWAY_BASELINE_ON_MIGRATE", &baseline.to_string()));
    }
    if let Some(schema) = &flyway.default_schema {
        env.push(plain_env("FLYWAY_DEFAULT_SCHEMA", schema));
    }

    env.extend(flyway.env_vars.iter().map(user_env));

    // BTreeMap iteration keeps placeholder order stable for hashing
    env.extend(
        source
            .placeholders
            .iter()
            .map(|(key, value)| plain_env(&format!("FLYWAY_PLACEHOLDERS_{key}"), value)),
    );

    env
}

fn plain_env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

fn secret_env(name: &str, secret: &SecretKeyRef) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.name.clone(),
                key: secret.key.clone(),
                optional: None,
            }),
            ..EnvVarSource::default()
        }),
    }
}

fn user_env(var: &EnvVarSpec) -> EnvVar {
    match &var.secret_key_ref {
        Some(secret) => secret_env(&var.name, secret),
        None => EnvVar {
            name: var.name.clone(),
            value: var.value.clone(),
            value_from: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::view::tests::sample_migration;
    use crate::crd::LocalObjectRef;

    fn view() -> MigrationView {
        MigrationView::parse(&sample_migration()).unwrap()
    }

    fn flyway_container(job: &Job) -> &Container {
        &job.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
    }

    fn env_names(job: &Job) -> Vec<String> {
        flyway_container(job)
            .env
            .as_ref()
            .unwrap()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    #[test]
    fn test_job_identity_matches_migration() {
        let job = JobBuilder::new("flyway:default").build(&view()).unwrap();
        assert_eq!(job.metadata.name.as_deref(), Some("orders"));
        assert_eq!(job.metadata.namespace.as_deref(), Some("shop"));
        let owner = &job.metadata.owner_references.as_ref().unwrap()[0];
        assert_eq!(owner.kind, "Migration");
        assert_eq!(owner.controller, Some(true));
    }

    #[test]
    fn test_job_carries_hash_and_generation_annotations() {
        let job = JobBuilder::new("flyway:default").build(&view()).unwrap();
        let annotations = job.metadata.annotations.as_ref().unwrap();
        let template = &job.spec.as_ref().unwrap().template;
        assert_eq!(
            annotations.get(SPEC_HASH_ANNOTATION),
            Some(&spec_hash(template).unwrap())
        );
        assert_eq!(annotations.get(GENERATION_ANNOTATION).map(String::as_str), Some("3"));
    }

    #[test]
    fn test_default_image_used_when_spec_has_none() {
        let job = JobBuilder::new("flyway:default").build(&view()).unwrap();
        assert_eq!(flyway_container(&job).image.as_deref(), Some("flyway:default"));
    }

    #[test]
    fn test_spec_image_overrides_default() {
        let mut migration = sample_migration();
        migration.spec.flyway_configuration.flyway_image = Some("flyway:custom".to_string());
        let view = MigrationView::parse(&migration).unwrap();
        let job = JobBuilder::new("flyway:default").build(&view).unwrap();
        assert_eq!(flyway_container(&job).image.as_deref(), Some("flyway:custom"));
    }

    #[test]
    fn test_args_append_json_output() {
        let job = JobBuilder::new("flyway:default").build(&view()).unwrap();
        assert_eq!(
            flyway_container(&job).args.as_ref().unwrap(),
            &vec![
                "info".to_string(),
                "migrate".to_string(),
                "info".to_string(),
                "-outputType=json".to_string()
            ]
        );
    }

    #[test]
    fn test_env_order_and_optional_settings() {
        let mut migration = sample_migration();
        migration.spec.flyway_configuration.baseline_on_migrate = Some(true);
        migration.spec.flyway_configuration.default_schema = Some("orders".to_string());
        migration.spec.flyway_configuration.env_vars = vec![EnvVarSpec {
            name: "FLYWAY_CONNECT_RETRIES".to_string(),
            value: Some("5".to_string()),
            secret_key_ref: None,
        }];
        migration.spec.migration_source.placeholders = BTreeMap::from([
            ("zone".to_string(), "eu".to_string()),
            ("app".to_string(), "orders".to_string()),
        ]);
        let view = MigrationView::parse(&migration).unwrap();
        let job = JobBuilder::new("flyway:default").build(&view).unwrap();

        assert_eq!(
            env_names(&job),
            vec![
                "FLYWAY_USER",
                "FLYWAY_PASSWORD",
                "FLYWAY_URL",
                "FLYWAY_ENCODING",
                "FLYWAY_BASELINE_ON_MIGRATE",
                "FLYWAY_DEFAULT_SCHEMA",
                "FLYWAY_CONNECT_RETRIES",
                "FLYWAY_PLACEHOLDERS_app",
                "FLYWAY_PLACEHOLDERS_zone",
            ]
        );
    }

    #[test]
    fn test_password_comes_from_secret() {
        let job = JobBuilder::new("flyway:default").build(&view()).unwrap();
        let env = flyway_container(&job).env.as_ref().unwrap();
        let password = env.iter().find(|e| e.name == "FLYWAY_PASSWORD").unwrap();
        assert!(password.value.is_none());
        let selector = password
            .value_from
            .as_ref()
            .and_then(|v| v.secret_key_ref.as_ref())
            .unwrap();
        assert_eq!(selector.name, "orders-db");
        assert_eq!(selector.key, "password");
    }

    #[test]
    fn test_copy_sql_init_container() {
        let mut migration = sample_migration();
        migration.spec.migration_source.path = "/migrations".to_string();
        migration.spec.migration_source.image_pull_secrets = vec![LocalObjectRef {
            name: "registry".to_string(),
        }];
        let view = MigrationView::parse(&migration).unwrap();
        let job = JobBuilder::new("flyway:default").build(&view).unwrap();
        let pod = job.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        let init = &pod.init_containers.as_ref().unwrap()[0];

        assert_eq!(init.image.as_deref(), Some("registry.local/orders-sql:1.0.0"));
        assert_eq!(
            init.args.as_ref().unwrap()[0],
            "cd /migrations && cp -rp * /mnt/target/"
        );
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));
        assert_eq!(pod.image_pull_secrets.as_ref().unwrap()[0].name, "registry");
        assert_eq!(job.spec.as_ref().unwrap().backoff_limit, Some(2));
    }
}
