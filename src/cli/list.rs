//! # List Command
//!
//! Command to list Migration resources.

use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use migration_controller::controller::reconciler::is_paused;
use migration_controller::crd::Migration;

/// List Migration resources in one namespace, or in all of them
pub async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<Migration> = if let Some(ns) = &namespace {
        println!("Listing Migration resources in namespace '{ns}'...");
        Api::namespaced(client, ns)
    } else {
        println!("Listing Migration resources in all namespaces...");
        Api::all(client)
    };

    let migrations = api
        .list(&ListParams::default())
        .await
        .context("Failed to list Migration resources")?;

    if migrations.items.is_empty() {
        println!("No Migration resources found.");
        return Ok(());
    }

    println!(
        "\n{:<30} {:<20} {:<8} {:<12} {:<30}",
        "NAME", "NAMESPACE", "PAUSED", "PHASE", "JOB"
    );
    println!("{}", "-".repeat(100));

    for migration in migrations.items {
        let name = migration.metadata.name.as_deref().unwrap_or("<unknown>");
        let ns = migration.metadata.namespace.as_deref().unwrap_or("<unknown>");
        let paused = if is_paused(migration.metadata.annotations.as_ref()) {
            "Yes"
        } else {
            "No"
        };
        let status = migration.status.as_ref();
        let phase = status
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("Unknown");
        let job = status.and_then(|s| s.job_name.as_deref()).unwrap_or("-");

        println!("{name:<30} {ns:<20} {paused:<8} {phase:<12} {job:<30}");
    }

    Ok(())
}
