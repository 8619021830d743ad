//! Query string helpers.
//!
//! Jellyseerr rejects query strings containing raw spaces or reserved
//! characters, so values are form-encoded before they reach the adapter and
//! the adapter appends them verbatim.

use std::collections::BTreeMap;

/// Query parameters whose keys and values are already form-encoded.
pub type QueryParams = BTreeMap<String, String>;

/// Form-encode a single query component (`+` for spaces).
pub fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Render encoded parameters as `k=v&k=v`.
pub(crate) fn render(params: &QueryParams) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
