mod args;
pub mod media;
pub mod ping;
pub mod raw;
mod registry;
#[cfg(test)]
pub(crate) mod testing;

pub use media::{GetRequestTool, RequestMediaTool, SearchMediaTool};
pub use ping::PingTool;
pub use raw::RawRequestTool;
pub use registry::{
    json_schema_enum, json_schema_free_object, json_schema_integer, json_schema_object,
    json_schema_string, Tool, ToolError, ToolRegistry, ToolResult,
};

use jellyseerr_client::UpstreamApi;
use std::sync::Arc;

/// Build the fixed Jellyseerr tool set around one upstream adapter.
pub fn default_registry(upstream: Arc<dyn UpstreamApi>, service: &str) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(PingTool::new(service)));
    registry.register(Arc::new(SearchMediaTool::new(upstream.clone())));
    registry.register(Arc::new(RequestMediaTool::new(upstream.clone())));
    registry.register(Arc::new(GetRequestTool::new(upstream.clone())));
    registry.register(Arc::new(RawRequestTool::new(upstream)));
    registry
}
