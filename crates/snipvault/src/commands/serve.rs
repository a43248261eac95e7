//! HTTP server command.

use snipvault_core::{AccessPolicy, Layout};
use snipvault_server::{create_router, AppState};
use snipvault_store::StoreConnector;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Serve the HTTP API until interrupted.
pub async fn serve(
    connector: impl StoreConnector + 'static,
    layout: Layout,
    policy: AccessPolicy,
    address: SocketAddr,
) -> anyhow::Result<()> {
    if policy.is_open() {
        tracing::warn!("No allowed users configured: every signed-in user may write");
    }
    info!(
        branch = %layout.branch,
        path = %layout.root(),
        "Serving snippets"
    );

    let state = AppState::new(Arc::new(connector), layout, policy);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
