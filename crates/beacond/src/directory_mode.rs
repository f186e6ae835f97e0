//! Directory mode — serves the shared name registry.

use std::sync::Arc;

use beacon_core::{Directory, MemoryDirectory};
use tracing::{error, info};

pub async fn run_directory(host: &str, port: u16) -> anyhow::Result<()> {
    let directory: Arc<dyn Directory> = Arc::new(MemoryDirectory::new());
    let router = beacon_transport::directory_router(directory);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "directory service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("directory service stopped");
    Ok(())
}
