//! # Initialization
//!
//! Controller startup: rustls setup, tracing, metrics, server startup, and
//! Kubernetes client setup.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::Migration;
use crate::observability;
use anyhow::{Context, Result};
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    /// Watched Migrations (one namespace or all)
    pub migrations: Api<Migration>,
    /// Watched Jobs, for owner-reference triggers
    pub jobs: Api<Job>,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
    pub controller_config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before any TLS connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    let controller_config = ControllerConfig::from_env();
    let server_config = ServerConfig::from_env();

    observability::logging::init_tracing(controller_config.log_format)
        .context("Failed to initialize tracing")?;

    info!("Starting Flyway Migration Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(config = ?controller_config, "Loaded controller configuration");

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let (migrations, jobs): (Api<Migration>, Api<Job>) =
        match controller_config.watch_namespace.as_deref() {
            Some(namespace) => {
                info!("Watching Migrations in namespace {}", namespace);
                (
                    Api::namespaced(client.clone(), namespace),
                    Api::namespaced(client.clone(), namespace),
                )
            }
            None => {
                info!("Watching Migrations in all namespaces");
                (Api::all(client.clone()), Api::all(client.clone()))
            }
        };

    check_crd_queryable(&migrations).await;

    let reconciler = Arc::new(Reconciler::from_client(
        client.clone(),
        controller_config.clone(),
    ));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        migrations,
        jobs,
        reconciler,
        server_state,
        controller_config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(server_config.poll_interval()).await;
    }
}

/// Log whether the Migration CRD is installed; the watch retries either way
async fn check_crd_queryable(migrations: &Api<Migration>) {
    match migrations.list(&ListParams::default().limit(1)).await {
        Ok(list) => info!(
            "CRD is queryable, found {} Migration resource(s) on the first page",
            list.items.len()
        ),
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: crdgen | kubectl apply -f -");
            warn!(error = %e, "Continuing despite CRD queryability check failure");
        }
    }
}
