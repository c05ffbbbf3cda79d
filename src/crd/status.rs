//! # Migration Status
//!
//! Status types for tracking reconciliation state and conditions.

use serde::{Deserialize, Serialize};

/// Status of the Migration resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    /// Current phase of the migration
    /// Values: Pending, Running, Succeeded, Failed, Paused, Invalid
    #[serde(default)]
    pub phase: Option<String>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Generation of the Migration last handled by the controller
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Name of the Job executing this migration
    #[serde(default)]
    pub job_name: Option<String>,
    /// Spec hash of the last Job observed to succeed
    /// Used to publish the `Succeeded` event once per successful run
    #[serde(default)]
    pub last_succeeded_spec_hash: Option<String>,
    /// Last reconciliation time (RFC3339)
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
}

impl MigrationStatus {
    /// Returns the `Ready` condition if present
    #[must_use]
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == "Ready")
    }
}

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing condition
    #[serde(default)]
    pub message: Option<String>,
}

/// Phase written to `status.phase`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Paused,
    Invalid,
}

impl MigrationPhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationPhase::Pending => "Pending",
            MigrationPhase::Running => "Running",
            MigrationPhase::Succeeded => "Succeeded",
            MigrationPhase::Failed => "Failed",
            MigrationPhase::Paused => "Paused",
            MigrationPhase::Invalid => "Invalid",
        }
    }

    /// Only a succeeded migration is reported as Ready
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, MigrationPhase::Succeeded)
    }
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
