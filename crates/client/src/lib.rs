//! # Jellyseerr Client
//!
//! Thin async adapter over the Jellyseerr REST API (`/api/v1`).
//!
//! Every call is a single best-effort HTTP exchange: no retries, no caching.
//! Successful responses are returned as opaque JSON; anything outside the
//! 2xx range becomes a [`ClientError::Api`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jellyseerr_client::{ClientConfig, ClientResult, JellyseerrClient, UpstreamApi};
//!
//! #[tokio::main]
//! async fn main() -> ClientResult<()> {
//!     let client = JellyseerrClient::new(ClientConfig::new(
//!         "http://localhost:5055",
//!         "your-api-key",
//!     ))?;
//!
//!     let results = client.search_media("Blade Runner").await?;
//!     println!("{results}");
//!
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod method;
pub mod query;

pub use client::{JellyseerrClient, UpstreamApi};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use method::HttpMethod;
pub use query::{encode_query_value, QueryParams};
