//! # Custom Resource Definitions
//!
//! CRD types for the Flyway Migration Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `Migration` specification and default values
//! - `status.rs` - Status types for tracking reconciliation state

mod spec;
mod status;

// Re-export all public types
pub use spec::{
    default_commands, default_encoding, default_sql_path, DatabaseConfig, EnvVarSpec,
    FlywayConfiguration, LocalObjectRef, Migration, MigrationSource, MigrationSpec, SecretKeyRef,
};
pub use status::{Condition, MigrationPhase, MigrationStatus};

/// API group of the `Migration` resource, also used as annotation prefix
pub const API_GROUP: &str = "flyway.octopilot.io";

/// Annotation that pauses all mutating actions when set to `"true"`
pub const PAUSED_ANNOTATION: &str = "flyway.octopilot.io/paused";

/// Annotation carrying the content hash of the pod template a Job was built from
pub const SPEC_HASH_ANNOTATION: &str = "flyway.octopilot.io/spec-hash";

/// Annotation carrying the Migration generation a Job was built from (informational)
pub const GENERATION_ANNOTATION: &str = "flyway.octopilot.io/migration-generation";
