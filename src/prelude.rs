//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use migration_controller::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Job construction and inspection
pub use crate::controller::job::{
    classify, spec_hash, BuildError, JobBuilder, JobComparator, JobLifecycle, SpecHashComparator,
};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    decide, reconcile, reconcile_migration, ActionExecutor, CreateOutcome, DeleteOutcome,
    JobAction, JobStore, MigrationView, Notification, Notifier, ObservedState, ReconcileOutcome,
    Reconciler, ReconcilerError, StoreError, ValidationError,
};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, LogFormat, ServerConfig};
