// MCP tool trait, registry and error type

use crate::protocol::ToolSchema;
use jellyseerr_client::ClientError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub type ToolResult<T> = Result<T, ToolError>;

/// Why a tool call failed.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Bad argument shape or value; raised before any upstream call.
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },

    /// The upstream call failed (connection or non-2xx).
    #[error(transparent)]
    Upstream(#[from] ClientError),
}

impl ToolError {
    pub fn invalid(tool: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool,
            message: message.into(),
        }
    }

    /// True when nothing was sent upstream.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::InvalidArguments { .. } => true,
            Self::Upstream(err) => err.is_local(),
        }
    }
}

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments, returning the upstream payload
    async fn execute(&self, arguments: Value) -> ToolResult<Value>;
}

/// Fixed set of tools, built once at server construction
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A second tool with the same name replaces the first.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        if self.tools.insert(schema.name.clone(), tool).is_some() {
            tracing::warn!(tool = %schema.name, "Tool registered twice, keeping the latest");
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all tool schemas, sorted by name
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_integer(description: &str) -> Value {
    serde_json::json!({
        "type": "integer",
        "minimum": 1,
        "description": description
    })
}

pub fn json_schema_enum(values: &[&str], description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "enum": values,
        "description": description
    })
}

pub fn json_schema_free_object(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "additionalProperties": true,
        "description": description
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool(&'static str);

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.0.to_string(),
                description: "echo".to_string(),
                input_schema: json_schema_object(serde_json::json!({}), vec![]),
            }
        }

        async fn execute(&self, arguments: Value) -> ToolResult<Value> {
            Ok(arguments)
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(EchoTool("zeta")));
        registry.register(Arc::new(EchoTool("alpha")));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("missing").is_none());

        let names: Vec<String> = registry.list_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool("ping")));
        registry.register(Arc::new(EchoTool("ping")));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_validation_classification() {
        assert!(ToolError::invalid("raw_request", "bad").is_validation());
        assert!(ToolError::Upstream(ClientError::InvalidMethod("PATCH".into())).is_validation());
        assert!(!ToolError::Upstream(ClientError::Api {
            status: 500,
            method: jellyseerr_client::HttpMethod::Get,
            url: "http://x/api/v1/status".into(),
            body: String::new(),
        })
        .is_validation());
    }
}
