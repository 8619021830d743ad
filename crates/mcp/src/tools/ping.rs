// Liveness tool

use crate::protocol::ToolSchema;
use crate::tools::{json_schema_object, Tool, ToolResult};
use serde_json::Value;

/// Static liveness check; never touches the upstream API.
pub struct PingTool {
    service: String,
}

impl PingTool {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for PingTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "ping".to_string(),
            description: "Simple liveness check.".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: Value) -> ToolResult<Value> {
        tracing::info!("Ping received");
        Ok(serde_json::json!({
            "ok": true,
            "service": self.service,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ping() {
        let tool = PingTool::new("jellyseerr-mcp");

        let result = tool.execute(Value::Null).await.unwrap();
        assert_eq!(result, serde_json::json!({"ok": true, "service": "jellyseerr-mcp"}));

        // Arguments are ignored
        let result = tool.execute(serde_json::json!({"extra": 1})).await.unwrap();
        assert_eq!(result["ok"], true);
    }
}
