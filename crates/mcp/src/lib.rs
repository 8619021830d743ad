// MCP (Model Context Protocol) surface for Jellyseerr
// Tool registry, the Jellyseerr tools, and the JSON-RPC dispatcher shared by all transports

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::{McpServer, SERVER_NAME, SERVICE_NAME};
