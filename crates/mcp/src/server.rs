// MCP request dispatcher shared by every transport

use crate::protocol::{
    negotiate_protocol_version, CallToolParams, CallToolResult, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolsCapability, JSONRPC_VERSION,
};
use crate::tools::{default_registry, ToolRegistry};
use jellyseerr_client::UpstreamApi;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "jellyseerr";

/// Name reported by the ping tool and the health probe.
pub const SERVICE_NAME: &str = "jellyseerr-mcp";

const INSTRUCTIONS: &str =
    "Search Jellyseerr for movies and TV shows, create media requests and check their status.";

/// Maps JSON-RPC messages onto the tool registry.
///
/// Holds no per-session state, so one instance is shared by every session
/// of every transport.
pub struct McpServer {
    registry: ToolRegistry,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Server with the standard Jellyseerr tool set.
    pub fn for_upstream(upstream: Arc<dyn UpstreamApi>) -> Self {
        Self::new(default_registry(upstream, SERVICE_NAME))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw frame. Returns `None` when no reply is due.
    pub async fn handle_text(&self, text: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                warn!(error = %e, "Unparsable JSON-RPC frame");
                Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ))
            }
        }
    }

    /// Handle one decoded JSON value.
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        if value.is_array() {
            return Some(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::invalid_request("Batch requests are not supported"),
            ));
        }

        // Replies from the client; we never issue requests, so drop them.
        if value.get("method").is_none()
            && (value.get("result").is_some() || value.get("error").is_some())
        {
            debug!("Ignoring JSON-RPC response from client");
            return None;
        }

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            )),
        }
    }

    /// Dispatch a decoded request.
    ///
    /// Every request carrying an id gets exactly one response, holding either
    /// a result or an error. Notifications never get one.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return request.id.map(|id| {
                JsonRpcResponse::error(id, JsonRpcError::invalid_request("jsonrpc must be \"2.0\""))
            });
        }

        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::error(id, err),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?;

        let (client_name, client_version) = params
            .client_info
            .as_ref()
            .map(|c| (c.name.as_str(), c.version.as_str()))
            .unwrap_or(("unknown", ""));
        let protocol_version = negotiate_protocol_version(&params.protocol_version);
        info!(
            client = client_name,
            client_version = client_version,
            requested = %params.protocol_version,
            protocol_version,
            "Client initialized"
        );

        to_result(&InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        })
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        to_result(&ListToolsResult {
            tools: self.registry.list_schemas(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let result = match tool.execute(params.arguments).await {
            Ok(payload) => CallToolResult::json(payload),
            Err(err) => {
                if err.is_validation() {
                    warn!(tool = %params.name, error = %err, "Tool call rejected");
                } else {
                    error!(tool = %params.name, error = %err, "Tool call failed");
                }
                CallToolResult::error(err.to_string())
            }
        };

        to_result(&result)
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}
