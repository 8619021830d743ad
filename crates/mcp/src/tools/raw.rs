// Low-level passthrough to any Jellyseerr endpoint

use crate::protocol::ToolSchema;
use crate::tools::args::Args;
use crate::tools::{
    json_schema_enum, json_schema_free_object, json_schema_object, json_schema_string, Tool,
    ToolError, ToolResult,
};
use jellyseerr_client::{encode_query_value, HttpMethod, QueryParams, UpstreamApi};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

const TOOL: &str = "raw_request";

/// Tool to call an arbitrary endpoint with one of the supported verbs
pub struct RawRequestTool {
    upstream: Arc<dyn UpstreamApi>,
}

impl RawRequestTool {
    pub fn new(upstream: Arc<dyn UpstreamApi>) -> Self {
        Self { upstream }
    }
}

/// Stringify and form-encode a JSON object into query parameters.
/// `null` values are dropped.
fn to_query_params(params: Map<String, Value>) -> QueryParams {
    params
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let raw = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (encode_query_value(&key), encode_query_value(&raw))
        })
        .collect()
}

#[async_trait::async_trait]
impl Tool for RawRequestTool {
    fn schema(&self) -> ToolSchema {
        let methods: Vec<&str> = HttpMethod::ALL.iter().map(|m| m.as_str()).collect();
        ToolSchema {
            name: TOOL.to_string(),
            description: "(Advanced) Low-level tool to call any Jellyseerr endpoint. Use with caution."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "method": json_schema_enum(&methods, "HTTP method"),
                    "endpoint": json_schema_string("Path below /api/v1, e.g. \"/status\""),
                    "params": json_schema_free_object("Query parameters"),
                    "body": json_schema_free_object("JSON request body")
                }),
                vec!["method", "endpoint"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> ToolResult<Value> {
        let args = Args::parse(TOOL, arguments)?;
        let method_name = args.required_str("method")?;
        let method: HttpMethod = method_name
            .parse()
            .map_err(|err: jellyseerr_client::ClientError| ToolError::invalid(TOOL, err.to_string()))?;
        let endpoint = args.required_str("endpoint")?;
        let params = args.optional_object("params")?.map(to_query_params);
        let body = args.optional_object("body")?.map(Value::Object);

        info!(method = %method, endpoint = %endpoint, "Raw request");
        let data = self
            .upstream
            .request(method, &endpoint, params.as_ref(), body.as_ref())
            .await?;
        info!("Raw request complete");
        Ok(data)
    }
}
