//! # Migration Job
//!
//! Everything the controller knows about the `batch/v1 Job` that runs a migration.
//!
//! - `builder`: renders the Job a Migration requires
//! - `classify`: maps an observed Job onto its lifecycle state
//! - `compare`: decides whether an observed Job still matches the candidate

pub mod builder;
pub mod classify;
pub mod compare;

pub use builder::{BuildError, JobBuilder};
pub use classify::{classify, JobLifecycle};
pub use compare::{spec_hash, JobComparator, SpecHashComparator};
