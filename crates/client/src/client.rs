//! HTTP adapter for the Jellyseerr API.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::method::HttpMethod;
use crate::query::{self, encode_query_value, QueryParams};
use reqwest::{header, Client};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use url::Url;

/// Upstream operations the tool dispatcher depends on.
///
/// [`JellyseerrClient`] is the production implementation; the convenience
/// calls are expressed in terms of [`UpstreamApi::request`] so any
/// implementation gets identical paths, parameters and bodies.
#[async_trait::async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Issue one call against the versioned API root.
    ///
    /// `params` must already be form-encoded (see [`encode_query_value`]).
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> ClientResult<Value>;

    /// `GET search?query=<encoded>`
    async fn search_media(&self, query: &str) -> ClientResult<Value> {
        let mut params = QueryParams::new();
        params.insert("query".to_string(), encode_query_value(query));
        self.request(HttpMethod::Get, "search", Some(&params), None)
            .await
    }

    /// `POST request` with `{mediaId, mediaType}`
    async fn request_media(&self, media_id: u64, media_type: &str) -> ClientResult<Value> {
        let body = serde_json::json!({
            "mediaId": media_id,
            "mediaType": media_type,
        });
        self.request(HttpMethod::Post, "request", None, Some(&body))
            .await
    }

    /// `GET request/{id}`
    async fn get_request(&self, request_id: u64) -> ClientResult<Value> {
        self.request(HttpMethod::Get, &format!("request/{}", request_id), None, None)
            .await
    }
}

/// Jellyseerr API client.
///
/// The underlying `reqwest::Client` is created on first use and released by
/// [`JellyseerrClient::close`]. A call after `close` creates a fresh one.
pub struct JellyseerrClient {
    api_base: String,
    config: ClientConfig,
    headers: header::HeaderMap,
    http: Mutex<Option<Client>>,
}

impl JellyseerrClient {
    /// Create a new client. No connection is made until the first call.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::Config("Jellyseerr URL is empty".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(ClientError::Config("Jellyseerr API key is empty".to_string()));
        }

        let api_base = config.api_base();
        let parsed = Url::parse(&api_base)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "Jellyseerr URL must use http or https, got: {}",
                parsed.scheme()
            )));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::HeaderName::from_static("x-api-key"),
            header::HeaderValue::from_str(config.api_key.trim())
                .map_err(|_| ClientError::Config("Invalid API key format".to_string()))?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(Self {
            api_base,
            config,
            headers,
            http: Mutex::new(None),
        })
    }

    /// Versioned API root every path is joined onto.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether an HTTP client is currently held.
    pub fn is_open(&self) -> bool {
        self.slot().is_some()
    }

    /// Release the HTTP client. Returns `false` if nothing was open.
    pub fn close(&self) -> bool {
        let released = self.slot().take().is_some();
        if released {
            debug!("Released upstream HTTP client");
        }
        released
    }

    /// Build the full URL for `path`, appending pre-encoded `params`.
    pub fn build_url(&self, path: &str, params: Option<&QueryParams>) -> ClientResult<Url> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.api_base,
            path.trim_start_matches('/')
        ))?;

        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let rendered = query::render(params);
            let combined = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{}&{}", existing, rendered),
                _ => rendered,
            };
            url.set_query(Some(&combined));
        }

        Ok(url)
    }

    /// Get the shared HTTP client, creating it on first use.
    ///
    /// Creation happens under the lock so concurrent first calls end up
    /// sharing one instance.
    fn http(&self) -> ClientResult<Client> {
        let mut slot = self.slot();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .timeout(self.config.timeout)
            .default_headers(self.headers.clone())
            .user_agent(concat!("jellyseerr-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Build)?;
        debug!(timeout_ms = self.config.timeout.as_millis() as u64, "Created upstream HTTP client");
        *slot = Some(client.clone());
        Ok(client)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Client>> {
        self.http.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl UpstreamApi for JellyseerrClient {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let url = self.build_url(path, params)?;
        let http = self.http()?;
        debug!(method = %method, url = %url, "Upstream request");

        let mut builder = http.request(method.into(), url.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| ClientError::Connection {
                method,
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), method = %method, url = %url, "Upstream API returned an error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                method,
                url: url.to_string(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Connection {
                method,
                url: url.to_string(),
                source,
            })?;

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
            method,
            url: url.to_string(),
            source,
        })
    }
}
