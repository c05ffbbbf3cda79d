//! # MIGCTL CLI
//!
//! Command-line interface for the Flyway Migration Controller.
//!
//! ## Usage
//!
//! ```bash
//! # List Migrations and their phase
//! migctl list
//!
//! # Show the spec, status, and Job of one Migration
//! migctl status orders-schema --namespace shop
//!
//! # Stop the controller from acting on a Migration
//! migctl pause orders-schema
//!
//! # Hand it back to the controller
//! migctl resume orders-schema
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};

mod list;
mod pause;
mod status;

/// Flyway Migration Controller CLI
#[derive(Parser)]
#[command(name = "migctl")]
#[command(
    about = "Flyway Migration Controller CLI",
    long_about = None,
    after_help = "\
Examples:
  migctl list --namespace shop
  migctl status orders-schema --namespace shop
  migctl pause orders-schema
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to 'default')
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Kubernetes context to use
    #[arg(short, long, global = true)]
    context: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List Migration resources
    List,
    /// Show detailed status of a Migration and its Job
    Status {
        /// Name of the Migration resource
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Pause a Migration; the controller leaves its Job alone until resumed
    Pause {
        /// Name of the Migration resource
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Resume a paused Migration
    Resume {
        /// Name of the Migration resource
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|provider| {
            anyhow::anyhow!("Failed to install rustls crypto provider, one is already set: {provider:?}")
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "migctl=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = client_for_context(cli.context.as_deref()).await?;

    match cli.command {
        Commands::List => list::list_command(client, cli.namespace).await,
        Commands::Status { name } => status::status_command(client, name, cli.namespace).await,
        Commands::Pause { name } => pause::pause_command(client, name, cli.namespace).await,
        Commands::Resume { name } => pause::resume_command(client, name, cli.namespace).await,
    }
}

/// Build a client from the kubeconfig, honouring `--context` when given
async fn client_for_context(context: Option<&str>) -> Result<Client> {
    let Some(context) = context else {
        return Client::try_default()
            .await
            .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.");
    };

    let options = KubeConfigOptions {
        context: Some(context.to_string()),
        ..KubeConfigOptions::default()
    };
    let config = Config::from_kubeconfig(&options)
        .await
        .with_context(|| format!("Failed to load kubeconfig context '{context}'"))?;
    Client::try_from(config).context("Failed to create Kubernetes client")
}
