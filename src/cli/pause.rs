//! # Pause/Resume Commands
//!
//! Toggle the pause annotation on a Migration. While paused the controller
//! still reports status but never creates or deletes the Job.

use anyhow::{Context, Result};
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use migration_controller::controller::reconciler::is_paused;
use migration_controller::crd::{Migration, PAUSED_ANNOTATION};
use serde_json::json;

/// Set the pause annotation on a Migration
pub async fn pause_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    println!("⏸️  Pausing Migration '{ns}/{name}'...");

    let api: Api<Migration> = Api::namespaced(client, ns);
    let migration = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get Migration '{ns}/{name}'"))?;

    if is_paused(migration.metadata.annotations.as_ref()) {
        println!("   ℹ️  Migration is already paused");
        return Ok(());
    }

    api.patch(
        &name,
        &PatchParams::default(),
        &Patch::Merge(annotation_patch(Some("true"))),
    )
    .await
    .with_context(|| format!("Failed to pause Migration '{ns}/{name}'"))?;

    println!("✅ Migration paused");
    println!("   Resource: {ns}/{name}");
    println!("\nTo resume, run:");
    println!("   migctl resume {name} --namespace {ns}");

    Ok(())
}

/// Remove the pause annotation from a Migration
pub async fn resume_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    println!("▶️  Resuming Migration '{ns}/{name}'...");

    let api: Api<Migration> = Api::namespaced(client, ns);
    let migration = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get Migration '{ns}/{name}'"))?;

    if !is_paused(migration.metadata.annotations.as_ref()) {
        println!("   ℹ️  Migration is not paused");
        return Ok(());
    }

    api.patch(
        &name,
        &PatchParams::default(),
        &Patch::Merge(annotation_patch(None)),
    )
    .await
    .with_context(|| format!("Failed to resume Migration '{ns}/{name}'"))?;

    println!("✅ Migration resumed");
    println!("   Resource: {ns}/{name}");
    println!("\nThe controller will reconcile this Migration shortly.");

    Ok(())
}

/// Merge patch that sets the annotation, or deletes it when `value` is `None`
fn annotation_patch(value: Option<&str>) -> serde_json::Value {
    json!({
        "metadata": {
            "annotations": {
                PAUSED_ANNOTATION: value
            }
        }
    })
}
