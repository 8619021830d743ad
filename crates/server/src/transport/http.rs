use crate::config::ServerConfig;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use jellyseerr_mcp::protocol::{JsonRpcError, JsonRpcResponse};
use jellyseerr_mcp::McpServer;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub const SESSION_HEADER: &str = "mcp-session-id";

/// `POST <mount>/mcp`: one JSON-RPC message per request, answered inline.
///
/// Other methods on the same path get 405 from the method router.
pub fn routes(config: &ServerConfig, server: Arc<McpServer>) -> Router {
    Router::new()
        .route(&config.mounted("mcp"), post(handle_post))
        .with_state(server)
}

async fn handle_post(State(server): State<Arc<McpServer>>, body: Bytes) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(error = %err, "Unparsable message body");
            let response = JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error(err.to_string()));
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let is_initialize = message.get("method").and_then(Value::as_str) == Some("initialize");

    match server.handle_value(message).await {
        None => StatusCode::ACCEPTED.into_response(),
        Some(response) => {
            let issue_session = is_initialize && !response.is_error();
            let mut http_response = Json(response).into_response();
            if issue_session {
                let session_id = Uuid::new_v4().simple().to_string();
                if let Ok(value) = HeaderValue::from_str(&session_id) {
                    http_response.headers_mut().insert(SESSION_HEADER, value);
                }
            }
            http_response
        }
    }
}
