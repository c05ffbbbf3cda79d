//! # Migration View
//!
//! A validated snapshot of a Migration taken at the start of a cycle.
//!
//! Identity (namespace and name) is checked when the view is parsed. Spec
//! validation is separate so that a paused or deleting Migration is handled
//! before its spec is judged.

use crate::crd::{Migration, MigrationSpec, MigrationStatus, PAUSED_ANNOTATION};
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use std::collections::BTreeMap;
use thiserror::Error;

/// Spec and identity problems found at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("migration has no name")]
    MissingName,
    #[error("migration {0} has no namespace")]
    MissingNamespace(String),
    #[error("database.username must not be empty")]
    EmptyUsername,
    #[error("database.jdbcUrl must start with 'jdbc:', got '{0}'")]
    InvalidJdbcUrl(String),
    #[error("database.credentials must name a secret and a key")]
    IncompleteCredentials,
    #[error("migrationSource.imageRef must not be empty")]
    EmptyImageRef,
    #[error("flywayConfiguration.commands must contain at least one command")]
    NoCommands,
    #[error("envVars[{0}] must set exactly one of value or secretKeyRef")]
    AmbiguousEnvVar(String),
}

/// Validated snapshot of a Migration
#[derive(Debug, Clone)]
pub struct MigrationView {
    pub namespace: String,
    pub name: String,
    pub generation: i64,
    pub paused: bool,
    pub deleting: bool,
    pub spec: MigrationSpec,
    pub status: Option<MigrationStatus>,
    /// Controller owner reference for the Job; `None` when the object has no uid yet
    pub owner_reference: Option<OwnerReference>,
    /// Target for published events
    pub object_ref: ObjectReference,
}

impl MigrationView {
    /// Take a snapshot of `migration`, checking only its identity
    pub fn parse(migration: &Migration) -> Result<Self, ValidationError> {
        let name = migration
            .metadata
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::MissingName)?;
        let namespace = migration
            .metadata
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| ValidationError::MissingNamespace(name.clone()))?;

        Ok(Self {
            namespace,
            name,
            generation: migration.metadata.generation.unwrap_or(0),
            paused: is_paused(migration.metadata.annotations.as_ref()),
            deleting: migration.metadata.deletion_timestamp.is_some(),
            spec: migration.spec.clone(),
            status: migration.status.clone(),
            owner_reference: migration.controller_owner_ref(&()),
            object_ref: migration.object_ref(&()),
        })
    }

    /// `namespace/name`, used for logging and per-resource backoff state
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Check the spec fields a Job cannot be built without
    pub fn validate(&self) -> Result<(), ValidationError> {
        let database = &self.spec.database;
        if database.username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if !database.jdbc_url.starts_with("jdbc:") {
            return Err(ValidationError::InvalidJdbcUrl(database.jdbc_url.clone()));
        }
        if database.credentials.name.is_empty() || database.credentials.key.is_empty() {
            return Err(ValidationError::IncompleteCredentials);
        }
        if self.spec.migration_source.image_ref.trim().is_empty() {
            return Err(ValidationError::EmptyImageRef);
        }
        if self.spec.flyway_configuration.commands.is_empty() {
            return Err(ValidationError::NoCommands);
        }
        for var in &self.spec.flyway_configuration.env_vars {
            if var.value.is_some() == var.secret_key_ref.is_some() {
                return Err(ValidationError::AmbiguousEnvVar(var.name.clone()));
            }
        }
        Ok(())
    }
}

/// A Migration is paused only when the annotation value is exactly `"true"`
#[must_use]
pub fn is_paused(annotations: Option<&BTreeMap<String, String>>) -> bool {
    annotations
        .and_then(|a| a.get(PAUSED_ANNOTATION))
        .is_some_and(|v| v == "true")
}
