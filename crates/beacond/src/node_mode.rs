//! Node mode — one election participant.
//!
//! 1. Binds the listen socket at the node's endpoint
//! 2. Registers the node name in the directory
//! 3. Serves peer RPCs and runs the scheduler
//! 4. On Ctrl-C, stops the scheduler and unbinds the name

use std::sync::Arc;

use anyhow::Context;
use beacon_cluster::{Node, Scheduler};
use beacon_core::BeaconConfig;
use beacon_transport::{HttpConnector, HttpDirectory};
use tokio::sync::watch;
use tracing::{error, info, warn};

pub async fn run_node(config: BeaconConfig) -> anyhow::Result<()> {
    let timing = config.timing()?;
    let identity = config.identity();
    info!(
        name = %identity.name(),
        endpoint = %identity.endpoint(),
        directory = %config.directory.address,
        "beacon node starting"
    );

    let node = Node::new(
        identity,
        Arc::new(HttpDirectory::new(
            config.directory.address.clone(),
            timing.rpc_timeout,
        )),
        Arc::new(HttpConnector::new(timing.rpc_timeout)),
        timing.rpc_timeout,
    );

    // ── Listener (bound before the name is registered) ───────────
    let listener = tokio::net::TcpListener::bind(node.identity().endpoint())
        .await
        .with_context(|| format!("failed to listen on {}", node.identity().endpoint()))?;

    node.register()
        .await
        .with_context(|| format!("failed to register {} in the directory", node.name()))?;

    // ── Scheduler ────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(node.clone(), timing);
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(shutdown_rx).await;
    });

    // ── RPC server ───────────────────────────────────────────────
    let router = beacon_transport::node_router(node.clone());
    info!(endpoint = %node.identity().endpoint(), "serving peer RPCs");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = scheduler_handle.await {
        error!(error = %e, "scheduler task failed");
    }

    match node.deregister().await {
        Ok(true) => info!(name = %node.name(), "unregistered from directory"),
        Ok(false) => info!(name = %node.name(), "already removed from directory"),
        Err(e) => warn!(error = %e, "failed to unregister from directory"),
    }

    info!("beacon node stopped");
    Ok(())
}
