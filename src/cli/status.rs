//! # Status Command
//!
//! Command to show the spec summary, status, and Job state of a Migration.

use anyhow::{Context, Result};
use k8s_openapi::api::batch::v1::Job;
use kube::api::Api;
use kube::Client;
use migration_controller::controller::job::{classify, SpecHashComparator};
use migration_controller::controller::reconciler::is_paused;
use migration_controller::crd::Migration;

/// Show detailed status of a Migration
pub async fn status_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    println!("📊 Status for Migration '{ns}/{name}'");
    println!();

    let migrations: Api<Migration> = Api::namespaced(client.clone(), ns);
    let migration = migrations
        .get(&name)
        .await
        .with_context(|| format!("Failed to get Migration '{ns}/{name}'"))?;

    println!("Resource Information:");
    println!("  Name: {name}");
    println!("  Namespace: {ns}");
    if let Some(uid) = &migration.metadata.uid {
        println!("  UID: {uid}");
    }
    if let Some(generation) = migration.metadata.generation {
        println!("  Generation: {generation}");
    }
    println!(
        "  Paused: {}",
        is_paused(migration.metadata.annotations.as_ref())
    );
    if migration.metadata.deletion_timestamp.is_some() {
        println!("  Deleting: true");
    }

    let spec = &migration.spec;
    println!();
    println!("Spec:");
    println!("  JDBC URL: {}", spec.database.jdbc_url);
    println!("  Username: {}", spec.database.username);
    println!(
        "  Credentials: secret {} key {}",
        spec.database.credentials.name, spec.database.credentials.key
    );
    println!(
        "  Commands: {}",
        spec.flyway_configuration.commands.join(" ")
    );
    if let Some(image) = &spec.flyway_configuration.flyway_image {
        println!("  Flyway Image: {image}");
    }
    if let Some(schema) = &spec.flyway_configuration.default_schema {
        println!("  Default Schema: {schema}");
    }
    println!("  SQL Image: {}", spec.migration_source.image_ref);
    println!("  SQL Path: {}", spec.migration_source.path);

    println!();
    match &migration.status {
        Some(status) => {
            println!("Status:");
            if let Some(phase) = &status.phase {
                println!("  Phase: {phase}");
            }
            if let Some(job_name) = &status.job_name {
                println!("  Job: {job_name}");
            }
            if let Some(observed_generation) = status.observed_generation {
                println!("  Observed Generation: {observed_generation}");
            }
            if let Some(hash) = &status.last_succeeded_spec_hash {
                println!("  Last Succeeded Spec Hash: {hash}");
            }
            if let Some(last_reconcile_time) = &status.last_reconcile_time {
                println!("  Last Reconcile Time: {last_reconcile_time}");
            }

            if !status.conditions.is_empty() {
                println!();
                println!("Conditions:");
                for condition in &status.conditions {
                    println!("  {}: {}", condition.r#type, condition.status);
                    if let Some(reason) = &condition.reason {
                        println!("    Reason: {reason}");
                    }
                    if let Some(message) = &condition.message {
                        println!("    Message: {message}");
                    }
                    if let Some(last_transition_time) = &condition.last_transition_time {
                        println!("    Last Transition: {last_transition_time}");
                    }
                }
            }
        }
        None => {
            println!("Status: No status available (Migration may not have been reconciled yet)");
        }
    }

    // The Job shares the Migration's name
    let jobs: Api<Job> = Api::namespaced(client, ns);
    let job = jobs
        .get_opt(&name)
        .await
        .with_context(|| format!("Failed to get Job '{ns}/{name}'"))?;

    println!();
    println!("Job:");
    println!("  State: {}", classify(job.as_ref()).as_str());
    if let Some(job) = &job {
        if let Some(hash) = SpecHashComparator::marker(job) {
            println!("  Spec Hash: {hash}");
        }
        if let Some(status) = &job.status {
            println!(
                "  Pods: active={} succeeded={} failed={}",
                status.active.unwrap_or(0),
                status.succeeded.unwrap_or(0),
                status.failed.unwrap_or(0)
            );
        }
    }

    Ok(())
}
