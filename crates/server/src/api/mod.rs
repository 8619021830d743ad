use crate::config::ServerConfig;
use crate::middleware::auth::{require_bearer, TokenVerifier, WELL_KNOWN_PATH};
use axum::{
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use jellyseerr_mcp::SERVICE_NAME;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

/// Wrap the transport's MCP routes with probes, auth and request tracing.
///
/// Probes stay at the root and are never behind auth, whatever the mount path.
pub fn create_router(config: &ServerConfig, mcp_routes: Router) -> Router {
    let mcp_routes = match &config.auth {
        Some(settings) => {
            let verifier = Arc::new(TokenVerifier::new(settings));
            mcp_routes.layer(middleware::from_fn_with_state(verifier, require_bearer))
        }
        None => mcp_routes,
    };

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check));

    if let Some(settings) = &config.auth {
        let metadata = settings.metadata();
        router = router.route(
            WELL_KNOWN_PATH,
            get(move || {
                let metadata = metadata.clone();
                async move { Json(metadata) }
            }),
        );
    }

    router.merge(mcp_routes).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new())
            .on_response(DefaultOnResponse::new()),
    )
}

async fn root() -> &'static str {
    "Jellyseerr MCP server is running"
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}
