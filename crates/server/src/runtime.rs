use crate::config::ServerConfig;
use crate::lifecycle::{Lifecycle, Phase};
use crate::transport;
use anyhow::{Context, Result};
use jellyseerr_client::JellyseerrClient;
use jellyseerr_mcp::McpServer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Closes the shared upstream client once serving ends, on every exit path.
struct UpstreamGuard(Arc<JellyseerrClient>);

impl Drop for UpstreamGuard {
    fn drop(&mut self) {
        if self.0.close() {
            tracing::info!("Jellyseerr client closed");
        }
    }
}

/// Bind, serve and tear down the selected transport.
pub async fn run(config: ServerConfig, lifecycle: Arc<Lifecycle>) -> Result<()> {
    let client = Arc::new(
        JellyseerrClient::new(config.upstream.clone()).context("Failed to create Jellyseerr client")?,
    );
    run_with_client(config, client, lifecycle).await
}

/// Serve with an existing client, which is closed before this returns.
async fn run_with_client(
    config: ServerConfig,
    client: Arc<JellyseerrClient>,
    lifecycle: Arc<Lifecycle>,
) -> Result<()> {
    let guard = UpstreamGuard(client.clone());
    tracing::info!(upstream = %client.api_base(), "Jellyseerr client configured");

    let server = Arc::new(McpServer::for_upstream(client));
    tracing::info!(tools = server.registry().len(), "MCP server ready");

    let shutdown = CancellationToken::new();
    let signals = transport::spawn_signal_watcher(shutdown.clone(), lifecycle.clone());

    let result: Result<()> = async {
        let bound = transport::bind(&config, server.clone(), shutdown.clone()).await?;
        lifecycle.advance(Phase::Bound);
        lifecycle.advance(Phase::Serving);
        bound.serve(server, shutdown.clone()).await
    }
    .await;

    lifecycle.advance(Phase::Draining);
    shutdown.cancel();
    if let Err(err) = signals.await {
        tracing::debug!(error = %err, "Signal watcher did not finish cleanly");
    }

    drop(guard);
    lifecycle.advance(Phase::Closed);
    tracing::info!("Shutdown complete");
    result
}
