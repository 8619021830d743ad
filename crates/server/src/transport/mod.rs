use crate::api::create_router;
use crate::config::{ServerConfig, TransportKind};
use crate::lifecycle::{Lifecycle, Phase};
use anyhow::{Context, Result};
use axum::Router;
use jellyseerr_mcp::McpServer;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub mod http;
pub mod sse;
pub mod stdio;

/// A transport that has acquired its resources and is ready to serve.
pub enum BoundTransport {
    Stdio,
    Http {
        kind: TransportKind,
        listener: TcpListener,
        app: Router,
    },
}

/// Bind the transport selected by `config`.
pub async fn bind(
    config: &ServerConfig,
    server: Arc<McpServer>,
    shutdown: CancellationToken,
) -> Result<BoundTransport> {
    let mcp_routes = match config.transport {
        TransportKind::Stdio => return Ok(BoundTransport::Stdio),
        TransportKind::Sse => sse::routes(config, server, shutdown),
        TransportKind::StreamableHttp => http::routes(config, server),
    };

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        transport = ?config.transport,
        addr = %addr,
        mount_path = %config.mount_path,
        auth = config.auth.is_some(),
        "Listening"
    );

    Ok(BoundTransport::Http {
        kind: config.transport,
        listener,
        app: create_router(config, mcp_routes),
    })
}

impl BoundTransport {
    /// Serve until the peer goes away or `shutdown` fires.
    pub async fn serve(self, server: Arc<McpServer>, shutdown: CancellationToken) -> Result<()> {
        match self {
            Self::Stdio => {
                tracing::info!("Serving MCP over stdio");
                stdio::serve(server, shutdown).await
            }
            Self::Http {
                kind,
                listener,
                app,
            } => {
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown.cancelled_owned())
                    .await
                    .with_context(|| format!("{:?} server failed", kind))
            }
        }
    }
}

/// Cancel `shutdown` on ctrl-c or SIGTERM.
pub fn spawn_signal_watcher(shutdown: CancellationToken, lifecycle: Arc<Lifecycle>) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = wait_for_signal() => {
                tracing::info!("Shutdown signal received");
                lifecycle.advance(Phase::Draining);
                shutdown.cancel();
            }
        }
    })
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::{Args, FileConfig, ServerConfig};
    use jellyseerr_client::{ClientResult, HttpMethod, QueryParams, UpstreamApi};
    use jellyseerr_mcp::McpServer;
    use serde_json::{json, Value};
    use std::sync::Arc;

    /// Upstream that echoes what it was asked to do.
    pub struct EchoUpstream;

    #[async_trait::async_trait]
    impl UpstreamApi for EchoUpstream {
        async fn request(
            &self,
            method: HttpMethod,
            path: &str,
            params: Option<&QueryParams>,
            body: Option<&Value>,
        ) -> ClientResult<Value> {
            Ok(json!({
                "method": method.as_str(),
                "path": path,
                "params": params,
                "body": body,
            }))
        }
    }

    pub fn server() -> Arc<McpServer> {
        Arc::new(McpServer::for_upstream(Arc::new(EchoUpstream)))
    }

    pub fn config(mount_path: &str) -> ServerConfig {
        let args = Args {
            jellyseerr_url: Some("http://jellyseerr.local:5055".to_string()),
            jellyseerr_api_key: Some("key".to_string()),
            mount_path: Some(mount_path.to_string()),
            ..Args::default()
        };
        ServerConfig::from_sources(&args, FileConfig::default()).unwrap()
    }
}
