//! # Controller
//!
//! Core controller modules for the Flyway Migration Controller.
//!
//! - `backoff`: Fibonacci backoff for retryable reconciliation errors
//! - `job`: building, classifying and comparing migration Jobs
//! - `reconciler`: core reconciliation logic
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod job;
pub mod reconciler;
pub mod server;
