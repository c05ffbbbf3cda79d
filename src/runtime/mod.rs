//! # Runtime
//!
//! Process-level wiring of the controller.
//!
//! - `initialization`: logging, metrics, probe server and Kubernetes client
//! - `watch_loop`: the `kube-runtime` controller and its restart loop
//! - `error_policy`: requeue decisions for failed reconciliations

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use initialization::{initialize, InitializationResult};
pub use watch_loop::run_watch_loop;
