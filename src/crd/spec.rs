//! # Migration Spec
//!
//! Main CRD specification types and default values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Migration Custom Resource Definition
///
/// Declares a Flyway migration that the controller runs as a single Kubernetes Job.
///
/// # Example
///
/// ```yaml
/// apiVersion: flyway.octopilot.io/v1alpha1
/// kind: Migration
/// metadata:
///   name: orders-schema
///   namespace: default
/// spec:
///   database:
///     username: orders
///     credentials:
///       name: orders-db
///       key: password
///     jdbcUrl: jdbc:postgresql://orders-db:5432/orders
///   flywayConfiguration:
///     commands: ["info", "migrate", "info"]
///   migrationSource:
///     imageRef: registry.example.com/orders-sql:1.4.0
///     path: /sql
/// ```
#[derive(kube::CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Migration",
    group = "flyway.octopilot.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::MigrationStatus",
    shortname = "mig",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Job", "type":"string", "jsonPath":".status.jobName"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSpec {
    /// Settings for the database connection
    pub database: DatabaseConfig,
    /// Settings for Flyway itself
    #[serde(default)]
    pub flyway_configuration: FlywayConfiguration,
    /// Settings defining where the SQL migrations come from
    pub migration_source: MigrationSource,
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Username for connecting to the database
    pub username: String,
    /// Secret key holding the password for connecting to the database
    pub credentials: SecretKeyRef,
    /// JDBC URL of the database, must start with `jdbc:`
    pub jdbc_url: String,
}

/// Reference to a single key of a Secret in the Migration's namespace
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    /// Secret name
    pub name: String,
    /// Key within the secret
    pub key: String,
}

/// Flyway runtime settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlywayConfiguration {
    /// Flyway image to use
    /// Falls back to the controller's `FLYWAY_IMAGE` setting when omitted
    #[serde(default)]
    pub flyway_image: Option<String>,
    /// Flyway commands to run, in order (e.g. "info", "migrate")
    /// Default: ["info", "migrate", "info"]
    #[serde(default = "default_commands")]
    pub commands: Vec<String>,
    /// Default schema managed by Flyway
    #[serde(default)]
    pub default_schema: Option<String>,
    /// Baseline an existing schema on first migrate
    #[serde(default)]
    pub baseline_on_migrate: Option<bool>,
    /// Extra environment variables for the Flyway container
    #[serde(default)]
    pub env_vars: Vec<EnvVarSpec>,
}

impl Default for FlywayConfiguration {
    fn default() -> Self {
        Self {
            flyway_image: None,
            commands: default_commands(),
            default_schema: None,
            baseline_on_migrate: None,
            env_vars: Vec::new(),
        }
    }
}

/// Environment variable passed to the Flyway container
///
/// Exactly one of `value` or `secretKeyRef` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSpec {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub secret_key_ref: Option<SecretKeyRef>,
}

/// Source of the SQL migration scripts
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSource {
    /// Image holding the SQL files
    pub image_ref: String,
    /// Image pull secrets needed to pull the source (and Flyway) images
    #[serde(default)]
    pub image_pull_secrets: Vec<LocalObjectRef>,
    /// Path within the image to the SQL files
    /// Default: "/sql"
    #[serde(default = "default_sql_path")]
    pub path: String,
    /// Encoding of the SQL files
    /// Default: "UTF-8"
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Flyway placeholders, injected as `FLYWAY_PLACEHOLDERS_<key>` env vars
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,
}

/// Reference to an object by name in the same namespace
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct LocalObjectRef {
    pub name: String,
}

/// Default Flyway commands
pub fn default_commands() -> Vec<String> {
    vec!["info".to_string(), "migrate".to_string(), "info".to_string()]
}

/// Default path of SQL files inside the source image
pub fn default_sql_path() -> String {
    "/sql".to_string()
}

/// Default SQL file encoding
pub fn default_encoding() -> String {
    "UTF-8".to_string()
}
