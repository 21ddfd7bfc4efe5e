//! Transport-independent request and response shapes.

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use url::Url;

/// A validated proxy call. Immutable for the lifetime of one call.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// Absolute target URL (http or https).
    pub target: Url,
    /// Lowercased target host, already checked against the allowlist.
    pub host: String,
    /// Diagnostic-snippet mode on upstream failure.
    pub debug: bool,
    /// Non-empty inbound `Authorization` value, forwarded verbatim.
    pub client_authorization: Option<HeaderValue>,
    /// Inbound headers, consulted by the header builder.
    pub client_headers: HeaderMap,
}

/// What the upstream returned.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The response handed back to the caller.
///
/// `binary` records whether the body is media that a text-only transport
/// must encode. The body itself is always raw bytes here.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub binary: bool,
}

impl ProxyResponse {
    /// A plain-text response, used for proxy-generated errors and snippets.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            status,
            headers,
            body: Bytes::from(body.into()),
            binary: false,
        }
    }

    /// A JSON response.
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        Self {
            status,
            headers,
            body: Bytes::from(value.to_string()),
            binary: false,
        }
    }
}
