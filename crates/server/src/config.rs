use crate::middleware::auth::AuthSettings;
use clap::{Parser, ValueEnum};
use jellyseerr_client::ClientConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: f64 = 15.0;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8797;
pub const DEFAULT_MOUNT_PATH: &str = "/";

/// Command line arguments. Every setting can also come from the environment.
#[derive(Parser, Debug, Default)]
#[command(name = "jellyseerr-mcp")]
#[command(version, about = "MCP server exposing Jellyseerr as tools", long_about = None)]
pub struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long, env = "JELLYSEERR_MCP_CONFIG", default_value = "jellyseerr-mcp.toml")]
    pub config: PathBuf,

    /// Jellyseerr base URL, e.g. http://localhost:5055
    #[arg(long, env = "JELLYSEERR_URL")]
    pub jellyseerr_url: Option<String>,

    /// Jellyseerr API key
    #[arg(long, env = "JELLYSEERR_API_KEY", hide_env_values = true)]
    pub jellyseerr_api_key: Option<String>,

    /// Upstream call timeout in seconds
    #[arg(long, env = "JELLYSEERR_TIMEOUT")]
    pub timeout: Option<String>,

    /// Transport to serve on
    #[arg(long, env = "MCP_TRANSPORT", value_enum)]
    pub transport: Option<TransportKind>,

    /// Host to bind to (networked transports)
    #[arg(long, env = "MCP_HOST")]
    pub host: Option<String>,

    /// Port to listen on (networked transports)
    #[arg(short, long, env = "MCP_PORT")]
    pub port: Option<u16>,

    /// Path prefix for the MCP endpoints
    #[arg(long, env = "MCP_MOUNT_PATH")]
    pub mount_path: Option<String>,

    /// Require a bearer token on networked transports
    #[arg(
        long,
        env = "AUTH_ENABLED",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub auth_enabled: Option<bool>,

    /// Authorization server (issuer) URL advertised to clients
    #[arg(long, env = "AUTH_ISSUER_URL")]
    pub auth_issuer_url: Option<String>,

    /// This server's resource identifier URL
    #[arg(long, env = "AUTH_RESOURCE_SERVER_URL")]
    pub auth_resource_server_url: Option<String>,

    /// Comma-separated scopes granted to accepted tokens
    #[arg(long, env = "AUTH_REQUIRED_SCOPES")]
    pub auth_required_scopes: Option<String>,

    /// Comma-separated list of accepted bearer tokens
    #[arg(long, env = "AUTH_BEARER_TOKENS", hide_env_values = true)]
    pub auth_bearer_tokens: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// Server-sent events stream plus a message endpoint
    Sse,
    /// One HTTP request per JSON-RPC exchange
    StreamableHttp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Missing configuration. Please set JELLYSEERR_URL and JELLYSEERR_API_KEY")]
    MissingUpstream,

    #[error("Invalid Jellyseerr URL {url}: {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },

    #[error("AUTH_ENABLED=true requires AUTH_ISSUER_URL and AUTH_RESOURCE_SERVER_URL to be set")]
    IncompleteAuth,

    #[error("Invalid {name} {value}: {reason}")]
    InvalidAuthUrl {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Mount path must start with '/', got {0:?}")]
    InvalidMountPath(String),
}

/// Outcome of looking for a `.env` file, reported once logging is up.
#[derive(Debug)]
pub enum DotenvStatus {
    Loaded(PathBuf),
    NotFound,
    Failed(dotenvy::Error),
}

/// Load `.env` from the working directory (or a parent) into the process
/// environment so the `env` bindings on [`Args`] pick it up. Variables that
/// are already set are left alone.
pub fn load_dotenv() -> DotenvStatus {
    dotenv_status(dotenvy::dotenv())
}

/// Same as [`load_dotenv`] for an explicit file.
pub fn load_dotenv_from(path: &Path) -> DotenvStatus {
    dotenv_status(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn dotenv_status(result: Result<PathBuf, dotenvy::Error>) -> DotenvStatus {
    match result {
        Ok(path) => DotenvStatus::Loaded(path),
        Err(err) if err.not_found() => DotenvStatus::NotFound,
        Err(err) => DotenvStatus::Failed(err),
    }
}

impl DotenvStatus {
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => tracing::info!(path = %path.display(), "Loaded environment from .env"),
            Self::NotFound => tracing::debug!("No .env file found"),
            Self::Failed(err) => tracing::warn!(error = %err, "Failed to load .env"),
        }
    }
}

/// Optional TOML file layered under environment and command line.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub jellyseerr: JellyseerrSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub auth: AuthSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JellyseerrSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub transport: Option<TransportKind>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mount_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    pub enabled: Option<bool>,
    pub issuer_url: Option<String>,
    pub resource_server_url: Option<String>,
    #[serde(default)]
    pub required_scopes: Vec<String>,
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
}

impl FileConfig {
    /// Read `path`, or fall back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Configuration file not found, using environment only");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validated, immutable process configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub upstream: ClientConfig,
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub mount_path: String,
    /// Present only when auth is enabled.
    pub auth: Option<AuthSettings>,
}

impl ServerConfig {
    /// Load the configuration file named by `args` and merge it with `args`.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let file = FileConfig::load(&args.config)?;
        Self::from_sources(args, file)
    }

    /// Merge sources (flags/env over file over defaults) and validate.
    pub fn from_sources(args: &Args, file: FileConfig) -> Result<Self, ConfigError> {
        let url = non_empty(args.jellyseerr_url.clone().or(file.jellyseerr.url));
        let api_key = non_empty(args.jellyseerr_api_key.clone().or(file.jellyseerr.api_key));
        let (url, api_key) = match (url, api_key) {
            (Some(url), Some(api_key)) => (url.trim_end_matches('/').to_string(), api_key),
            _ => return Err(ConfigError::MissingUpstream),
        };
        validate_http_url(&url).map_err(|reason| ConfigError::InvalidUpstreamUrl {
            url: url.clone(),
            reason,
        })?;

        let timeout = match &args.timeout {
            Some(raw) => parse_timeout(raw),
            None => file
                .jellyseerr
                .timeout
                .map(|secs| parse_timeout(&secs.to_string()))
                .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)),
        };

        let mount_path = args
            .mount_path
            .clone()
            .or(file.server.mount_path)
            .unwrap_or_else(|| DEFAULT_MOUNT_PATH.to_string());
        if !mount_path.starts_with('/') {
            return Err(ConfigError::InvalidMountPath(mount_path));
        }

        let auth_enabled = args.auth_enabled.or(file.auth.enabled).unwrap_or(false);
        let scopes = match &args.auth_required_scopes {
            Some(raw) => split_list(raw),
            None => clean_list(file.auth.required_scopes),
        };
        let tokens = match &args.auth_bearer_tokens {
            Some(raw) => split_list(raw),
            None => clean_list(file.auth.bearer_tokens),
        };
        let auth = AuthSettings::from_parts(
            auth_enabled,
            args.auth_issuer_url.clone().or(file.auth.issuer_url).as_deref(),
            args.auth_resource_server_url
                .clone()
                .or(file.auth.resource_server_url)
                .as_deref(),
            scopes,
            tokens,
        )?;

        Ok(Self {
            upstream: ClientConfig::new(url, api_key).with_timeout(timeout),
            transport: args
                .transport
                .or(file.server.transport)
                .unwrap_or(TransportKind::Stdio),
            host: args
                .host
                .clone()
                .or(file.server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: args.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
            mount_path,
            auth,
        })
    }

    /// `host:port` for networked transports.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Join `suffix` onto the mount path.
    pub fn mounted(&self, suffix: &str) -> String {
        format!(
            "{}/{}",
            self.mount_path.trim_end_matches('/'),
            suffix.trim_start_matches('/')
        )
    }
}

/// Timeouts that are unparsable, non-finite or non-positive fall back to the default.
fn parse_timeout(raw: &str) -> Duration {
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
        _ => {
            tracing::warn!(value = raw, default = DEFAULT_TIMEOUT_SECS, "Invalid JELLYSEERR_TIMEOUT, using default");
            Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    clean_list(raw.split(',').map(str::to_string).collect())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Absolute http(s) URL with a host.
pub(crate) fn validate_http_url(raw: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(raw).map_err(|e| e.to_string())?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("scheme must be http or https, got {}", parsed.scheme()));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err("URL has no host".to_string());
    }
    Ok(parsed)
}
