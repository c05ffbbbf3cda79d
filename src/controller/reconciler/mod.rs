//! # Reconciler
//!
//! Core reconciliation logic for `Migration` resources.
//!
//! The reconciler keeps exactly one migration Job per Migration:
//! - Builds the Job the current spec requires
//! - Classifies and compares the Job that exists
//! - Creates, replaces or leaves the Job alone
//! - Reports progress through the Migration status and Kubernetes Events
//!
//! ## Reconciliation Flow
//!
//! 1. Fresh read of the Migration (`store`)
//! 2. Validation at the boundary (`view`)
//! 3. Decision from observed state (`engine`)
//! 4. Cluster writes (`executor`)
//! 5. Status and notifications (`status`, `notify`)

pub mod engine;
pub mod executor;
pub mod notify;
pub mod reconcile;
pub mod status;
pub mod store;
pub mod types;
pub mod view;

// Re-export public API
pub use engine::{decide, Decision, JobAction, ObservedState, PlannedOutcome};
pub use executor::{ActionExecutor, Executed};
pub use notify::{EventNotifier, Notification, Notifier, Severity};
pub use reconcile::{reconcile, reconcile_migration};
pub use store::{CreateOutcome, DeleteOutcome, JobStore, KubeJobStore, StoreError};
pub use types::{ReconcileOutcome, Reconciler, ReconcilerError};
pub use view::{is_paused, MigrationView, ValidationError};
