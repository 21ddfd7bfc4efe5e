//! Log redaction for header sets.
//!
//! Upstream responses are logged on failure. Credential-bearing header values
//! are replaced before anything reaches a log line.

use axum::http::HeaderMap;

/// Header names whose values never appear in logs (compared lowercase).
pub const SENSITIVE_HEADER_NAMES: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "www-authenticate",
    "proxy-authenticate",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
    "x-access-token",
    "x-app-password",
];

const REDACTED: &str = "[redacted]";

pub fn is_sensitive(name: &str) -> bool {
    SENSITIVE_HEADER_NAMES.contains(&name.to_ascii_lowercase().as_str())
}

/// Header pairs safe to log.
pub fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_sensitive(name.as_str()) {
                REDACTED.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}
