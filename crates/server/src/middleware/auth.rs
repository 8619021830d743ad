use crate::config::{validate_http_url, ConfigError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

pub const WELL_KNOWN_PATH: &str = "/.well-known/oauth-protected-resource";

const BEARER_PREFIX: &str = "Bearer ";

/// Bearer token settings for networked transports.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub issuer_url: Url,
    pub resource_server_url: Url,
    pub required_scopes: Vec<String>,
    pub bearer_tokens: BTreeSet<String>,
}

impl AuthSettings {
    /// Build settings when auth is enabled; `Ok(None)` when it is not.
    pub fn from_parts(
        enabled: bool,
        issuer_url: Option<&str>,
        resource_server_url: Option<&str>,
        required_scopes: Vec<String>,
        bearer_tokens: Vec<String>,
    ) -> Result<Option<Self>, ConfigError> {
        if !enabled {
            return Ok(None);
        }

        let (issuer, resource) = match (
            issuer_url.map(str::trim).filter(|s| !s.is_empty()),
            resource_server_url.map(str::trim).filter(|s| !s.is_empty()),
        ) {
            (Some(issuer), Some(resource)) => (issuer, resource),
            _ => return Err(ConfigError::IncompleteAuth),
        };

        let issuer_url = parse_auth_url("AUTH_ISSUER_URL", issuer)?;
        let resource_server_url = parse_auth_url("AUTH_RESOURCE_SERVER_URL", resource)?;

        let bearer_tokens: BTreeSet<String> = bearer_tokens.into_iter().collect();
        if bearer_tokens.is_empty() {
            tracing::warn!("Auth is enabled but AUTH_BEARER_TOKENS is empty; every request will be rejected");
        }

        Ok(Some(Self {
            issuer_url,
            resource_server_url,
            required_scopes,
            bearer_tokens,
        }))
    }

    pub fn metadata(&self) -> ProtectedResourceMetadata {
        ProtectedResourceMetadata {
            resource: self.resource_server_url.to_string(),
            authorization_servers: vec![self.issuer_url.to_string()],
            scopes_supported: self.required_scopes.clone(),
            bearer_methods_supported: vec!["header".to_string()],
        }
    }
}

fn parse_auth_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    validate_http_url(value).map_err(|reason| ConfigError::InvalidAuthUrl {
        name,
        value: value.to_string(),
        reason,
    })
}

/// OAuth protected resource metadata (RFC 9728).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub bearer_methods_supported: Vec<String>,
}

/// An accepted bearer token.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &fingerprint(&self.token))
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Static allow-list verifier. Tokens are never logged, only fingerprints.
pub struct TokenVerifier {
    allowed: BTreeSet<String>,
    scopes: Vec<String>,
}

impl TokenVerifier {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            allowed: settings.bearer_tokens.clone(),
            scopes: settings.required_scopes.clone(),
        }
    }

    /// Accept `token` (with or without a `Bearer ` prefix) when it is on the allow-list.
    pub fn verify(&self, token: &str) -> Option<AccessToken> {
        let token = token.strip_prefix(BEARER_PREFIX).unwrap_or(token).trim();
        if token.is_empty() {
            return None;
        }

        if self.allowed.contains(token) {
            Some(AccessToken {
                token: token.to_string(),
                client_id: "env-bearer".to_string(),
                scopes: self.scopes.clone(),
            })
        } else {
            tracing::warn!(token = %fingerprint(token), "Rejected bearer token");
            None
        }
    }

    /// Verify the `Authorization` header of a request.
    pub fn verify_headers(&self, headers: &HeaderMap) -> Option<AccessToken> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            tracing::warn!("Missing Authorization header");
            return None;
        };
        let Ok(value) = value.to_str() else {
            tracing::warn!("Authorization header is not valid ASCII");
            return None;
        };
        if !value.starts_with(BEARER_PREFIX) {
            tracing::warn!("Authorization header is not a bearer token");
            return None;
        }
        self.verify(value)
    }
}

/// First 12 hex chars of the token's SHA-256.
pub fn fingerprint(token: &str) -> String {
    let digest = hex::encode(Sha256::digest(token.as_bytes()));
    digest[..12].to_string()
}

/// Reject requests without an accepted bearer token.
pub async fn require_bearer(
    State(verifier): State<Arc<TokenVerifier>>,
    mut req: Request,
    next: Next,
) -> Response {
    match verifier.verify_headers(req.headers()) {
        Some(token) => {
            req.extensions_mut().insert(token);
            next.run(req).await
        }
        None => unauthorized(),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(serde_json::json!({ "error": "unauthorized" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn settings(tokens: &[&str]) -> AuthSettings {
        AuthSettings::from_parts(
            true,
            Some("https://auth.example.com"),
            Some("https://mcp.example.com/"),
            vec!["media:read".to_string()],
            tokens.iter().map(|t| t.to_string()).collect(),
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_disabled_auth_is_none() {
        let auth = AuthSettings::from_parts(false, None, None, vec![], vec![]).unwrap();
        assert!(auth.is_none());
    }

    #[test]
    fn test_enabled_auth_requires_both_urls() {
        for (issuer, resource) in [
            (None, Some("https://mcp.example.com")),
            (Some("https://auth.example.com"), None),
            (Some("  "), Some("https://mcp.example.com")),
        ] {
            let result = AuthSettings::from_parts(true, issuer, resource, vec![], vec![]);
            assert!(matches!(result, Err(ConfigError::IncompleteAuth)));
        }
    }

    #[test]
    fn test_enabled_auth_rejects_bad_urls() {
        let result = AuthSettings::from_parts(
            true,
            Some("ftp://auth.example.com"),
            Some("https://mcp.example.com"),
            vec![],
            vec![],
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidAuthUrl { name: "AUTH_ISSUER_URL", .. })
        ));
    }

    #[test]
    fn test_verify_allow_list() {
        let verifier = TokenVerifier::new(&settings(&["tok-a", "tok-b"]));

        let token = verifier.verify("tok-a").unwrap();
        assert_eq!(token.client_id, "env-bearer");
        assert_eq!(token.scopes, vec!["media:read"]);
        assert!(verifier.verify("Bearer tok-b").is_some());
        assert!(verifier.verify("tok-c").is_none());
        assert!(verifier.verify("").is_none());
        assert!(verifier.verify("bearer tok-a").is_none());
    }

    #[test]
    fn test_empty_allow_list_rejects_everything() {
        let verifier = TokenVerifier::new(&settings(&[]));
        assert!(verifier.verify("anything").is_none());
    }

    #[test]
    fn test_verify_headers() {
        let verifier = TokenVerifier::new(&settings(&["tok-a"]));

        let mut headers = HeaderMap::new();
        assert!(verifier.verify_headers(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dG9rLWE="));
        assert!(verifier.verify_headers(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-a"));
        assert!(verifier.verify_headers(&headers).is_some());
    }

    #[test]
    fn test_fingerprint_hides_token() {
        let fp = fingerprint("secret-token");
        assert_eq!(fp.len(), 12);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fingerprint("secret-token"));

        let debug = format!("{:?}", TokenVerifier::new(&settings(&[])).verify("x"));
        assert_eq!(debug, "None");
        let token = TokenVerifier::new(&settings(&["secret-token"]))
            .verify("secret-token")
            .unwrap();
        assert!(!format!("{:?}", token).contains("secret-token"));
    }

    #[test]
    fn test_metadata() {
        let metadata = settings(&[]).metadata();
        assert_eq!(metadata.resource, "https://mcp.example.com/");
        assert_eq!(metadata.authorization_servers, vec!["https://auth.example.com/"]);
        assert_eq!(metadata.scopes_supported, vec!["media:read"]);
        assert_eq!(metadata.bearer_methods_supported, vec!["header"]);
    }
}
