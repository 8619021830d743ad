// Argument extraction shared by the tools

use super::registry::{ToolError, ToolResult};
use serde_json::{Map, Value};

/// Tool arguments as received in `tools/call`.
pub(crate) struct Args {
    tool: &'static str,
    map: Map<String, Value>,
}

impl Args {
    /// Absent or `null` arguments are treated as `{}`.
    pub fn parse(tool: &'static str, arguments: Value) -> ToolResult<Self> {
        match arguments {
            Value::Null => Ok(Self { tool, map: Map::new() }),
            Value::Object(map) => Ok(Self { tool, map }),
            other => Err(ToolError::invalid(
                tool,
                format!("arguments must be a JSON object, got {}", type_name(&other)),
            )),
        }
    }

    pub fn required_str(&self, key: &str) -> ToolResult<String> {
        match self.map.get(key) {
            None | Some(Value::Null) => Err(self.missing(key)),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(ToolError::invalid(self.tool, format!("`{}` must not be empty", key)))
            }
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(ToolError::invalid(
                self.tool,
                format!("`{}` must be a string, got {}", key, type_name(other)),
            )),
        }
    }

    /// Accepts a JSON integer or a string of digits; zero is rejected.
    pub fn positive_int(&self, key: &str) -> ToolResult<u64> {
        let parsed = match self.map.get(key) {
            None | Some(Value::Null) => return Err(self.missing(key)),
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };

        match parsed {
            Some(n) if n > 0 => Ok(n),
            _ => Err(ToolError::invalid(
                self.tool,
                format!("`{}` must be a positive integer", key),
            )),
        }
    }

    pub fn optional_object(&self, key: &str) -> ToolResult<Option<Map<String, Value>>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(other) => Err(ToolError::invalid(
                self.tool,
                format!("`{}` must be a JSON object, got {}", key, type_name(other)),
            )),
        }
    }

    fn missing(&self, key: &str) -> ToolError {
        ToolError::invalid(self.tool, format!("missing required argument `{}`", key))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
