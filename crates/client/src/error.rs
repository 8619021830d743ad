//! Error types for the Jellyseerr client.

use crate::method::HttpMethod;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while talking to the upstream API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connect failure, timeout, reset).
    #[error("Connection error calling {method} {url}: {source}")]
    Connection {
        method: HttpMethod,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a status outside 2xx.
    #[error("Jellyseerr API error {status} for {method} {url}: {body}")]
    Api {
        status: u16,
        method: HttpMethod,
        url: String,
        body: String,
    },

    /// A 2xx response whose body is not JSON.
    #[error("Invalid JSON in response to {method} {url}: {source}")]
    Decode {
        method: HttpMethod,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// HTTP verb outside the supported set.
    #[error("Unsupported method: {0}. Must be one of GET, POST, PUT, DELETE")]
    InvalidMethod(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ClientError {
    /// Whether the error was produced locally, before any network traffic.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidMethod(_) | Self::InvalidUrl(_) | Self::Config(_) | Self::Build(_)
        )
    }

    /// HTTP status code, for upstream API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
