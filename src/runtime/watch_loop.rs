//! # Watch Loop
//!
//! Runs the `kube-runtime` controller over Migrations and the Jobs they own,
//! restarting the watch whenever its stream ends before shutdown.
//!
//! SIGINT and SIGTERM resolve one shared shutdown trigger. It marks the probe
//! server not ready before any controller starts draining, so the restart
//! loop always sees the shutdown once the stream ends.

use crate::controller::reconciler::{reconcile, ReconcilerError};
use crate::controller::server::ServerState;
use crate::crd::Migration;
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::runtime::initialization::InitializationResult;
use futures::future::{BoxFuture, Shared};
use futures::{Future, FutureExt, StreamExt};
use kube_runtime::controller::{self, Action};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run the controller until a shutdown signal arrives
pub async fn run_watch_loop(init: InitializationResult) -> Result<(), anyhow::Error> {
    let InitializationResult {
        migrations,
        jobs,
        reconciler,
        server_state,
        controller_config,
        ..
    } = init;

    let shutdown = shutdown_trigger(os_shutdown_signal()?, Arc::clone(&server_state));
    tokio::spawn(shutdown.clone());

    let controller_settings =
        controller::Config::default().concurrency(controller_config.max_concurrent_reconciliations);

    loop {
        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        info!(
            max_concurrent_reconciliations = controller_config.max_concurrent_reconciliations,
            "Starting controller watch loop..."
        );
        Controller::new(migrations.clone(), watcher::Config::default().any_semantic())
            .owns(jobs.clone(), watcher::Config::default())
            .with_config(controller_settings.clone())
            .graceful_shutdown_on(shutdown.clone())
            .run(
                reconcile,
                handle_reconciliation_error,
                Arc::clone(&reconciler),
            )
            .for_each(|result| {
                log_controller_result(&result);
                futures::future::ready(())
            })
            .await;

        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = controller_config.watch_restart_delay_duration();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = shutdown.clone() => {}
        }
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Shutdown future shared by every controller the loop starts
pub type ShutdownTrigger = Shared<BoxFuture<'static, ()>>;

/// Wrap `signal` so that it marks `server_state` not ready before resolving
///
/// Clones resolve together, and clones taken after the signal resolve at once.
pub fn shutdown_trigger<F>(signal: F, server_state: Arc<ServerState>) -> ShutdownTrigger
where
    F: Future<Output = &'static str> + Send + 'static,
{
    async move {
        let name = signal.await;
        info!(signal = name, "Received shutdown signal, initiating graceful shutdown...");
        server_state.set_ready(false);
    }
    .boxed()
    .shared()
}

/// Resolve with the signal name on SIGINT or SIGTERM
///
/// The handlers are installed before this returns, so a signal arriving
/// before the future is first polled is not lost.
#[cfg(unix)]
pub fn os_shutdown_signal(
) -> Result<impl Future<Output = &'static str> + Send + 'static, std::io::Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        }
    })
}

#[cfg(not(unix))]
pub fn os_shutdown_signal(
) -> Result<impl Future<Output = &'static str> + Send + 'static, std::io::Error> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(e) => {
                warn!(error = %e, "Failed to listen for ctrl-c");
                futures::future::pending().await
            }
        }
    })
}

type ControllerResult = Result<
    (ObjectRef<Migration>, Action),
    controller::Error<ReconcilerError, watcher::Error>,
>;

fn log_controller_result(result: &ControllerResult) {
    match result {
        Ok((obj, action)) => {
            debug!(resource = %obj, action = ?action, "watch.event.reconciled");
        }
        // Already logged by the error policy
        Err(controller::Error::ReconcilerFailed(_, obj)) => {
            debug!(resource = %obj, "watch.event.reconciliation_failed");
        }
        Err(controller::Error::ObjectNotFound(obj)) => {
            debug!(resource = %obj, "Migration disappeared before it could be reconciled");
        }
        Err(e) => warn!(error = %e, "Controller stream error"),
    }
}
