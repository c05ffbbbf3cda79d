//! Flyway Migration Controller Library
//!
//! This library provides the core functionality for the Flyway Migration Controller.
//! Unit tests live next to the code; end-to-end cycle tests are under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use migration_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
