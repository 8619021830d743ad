// Media tools: search, request creation, request lookup

use crate::protocol::ToolSchema;
use crate::tools::args::Args;
use crate::tools::{json_schema_integer, json_schema_object, json_schema_string, Tool, ToolResult};
use jellyseerr_client::UpstreamApi;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Tool to search Jellyseerr by free text
pub struct SearchMediaTool {
    upstream: Arc<dyn UpstreamApi>,
}

impl SearchMediaTool {
    pub fn new(upstream: Arc<dyn UpstreamApi>) -> Self {
        Self { upstream }
    }
}

#[async_trait::async_trait]
impl Tool for SearchMediaTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_media".to_string(),
            description: "Search Jellyseerr for media by text query.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "query": json_schema_string("Movie or TV show title to search for")
                }),
                vec!["query"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> ToolResult<Value> {
        let args = Args::parse("search_media", arguments)?;
        let query = args.required_str("query")?;

        info!(query = %query, "Searching media");
        let data = self.upstream.search_media(&query).await?;
        info!("Search complete");
        Ok(data)
    }
}

/// Tool to create a media request
pub struct RequestMediaTool {
    upstream: Arc<dyn UpstreamApi>,
}

impl RequestMediaTool {
    pub fn new(upstream: Arc<dyn UpstreamApi>) -> Self {
        Self { upstream }
    }
}

#[async_trait::async_trait]
impl Tool for RequestMediaTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "request_media".to_string(),
            description: "Create a media request in Jellyseerr.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "media_id": json_schema_integer("TMDB id of the movie or show"),
                    "media_type": json_schema_string("Media type, e.g. \"movie\" or \"tv\"")
                }),
                vec!["media_id", "media_type"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> ToolResult<Value> {
        let args = Args::parse("request_media", arguments)?;
        let media_id = args.positive_int("media_id")?;
        let media_type = args.required_str("media_type")?;

        info!(media_id, media_type = %media_type, "Requesting media");
        let data = self.upstream.request_media(media_id, &media_type).await?;
        info!("Request created");
        Ok(data)
    }
}

/// Tool to fetch a request's details and status
pub struct GetRequestTool {
    upstream: Arc<dyn UpstreamApi>,
}

impl GetRequestTool {
    pub fn new(upstream: Arc<dyn UpstreamApi>) -> Self {
        Self { upstream }
    }
}

#[async_trait::async_trait]
impl Tool for GetRequestTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_request".to_string(),
            description: "Get Jellyseerr request details/status by id.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "request_id": json_schema_integer("Jellyseerr request id")
                }),
                vec!["request_id"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> ToolResult<Value> {
        let args = Args::parse("get_request", arguments)?;
        let request_id = args.positive_int("request_id")?;

        info!(request_id, "Fetching request");
        let data = self.upstream.get_request(request_id).await?;
        info!("Request fetched");
        Ok(data)
    }
}
