//! Configuration types for the Jellyseerr client.

use std::fmt;
use std::time::Duration;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Path segment every API call is prefixed with.
pub const API_PREFIX: &str = "api/v1";

/// Configuration for the Jellyseerr client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Root URL of the Jellyseerr instance, e.g. `http://localhost:5055`.
    pub base_url: String,
    /// API key sent as `X-Api-Key`.
    pub api_key: String,
    /// Applied to the whole call (connect, send, read).
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with the default timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Versioned API root: `<base_url>/api/v1`.
    pub fn api_base(&self) -> String {
        format!("{}/{}", self.base_url.trim().trim_end_matches('/'), API_PREFIX)
    }
}

// The API key stays out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
