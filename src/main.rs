//! # Flyway Migration Controller
//!
//! A Kubernetes controller that runs Flyway database migrations declared as
//! `Migration` resources.
//!
//! Each Migration converges to exactly one `batch/v1 Job` that copies the SQL
//! files out of the migration source image and runs Flyway against the
//! configured database. Jobs are replaced when the spec changes after a run
//! or when a run fails, and are never preempted while running.
//!
//! Annotate a Migration with `flyway.octopilot.io/paused: "true"` to stop all
//! Job changes for it.

use anyhow::Result;
use migration_controller::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(init).await
}
