//! Proxy error taxonomy.
//!
//! Validation and allowlist failures are terminal. Upstream application
//! errors are not errors at all (their status is forwarded). Token
//! acquisition failures never reach this type; the credential manager
//! recovers them locally.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::proxy::types::ProxyResponse;
use crate::upstream::FetchError;

/// Errors that terminate a proxy call.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The `url` query parameter is absent or empty.
    #[error("Missing url parameter")]
    MissingParameter,

    /// The target could not be parsed as an absolute http(s) URL.
    #[error("Invalid target URL")]
    InvalidUrl,

    /// The target host is not on the allowlist. No upstream call was made.
    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    /// The upstream could not be reached.
    #[error("Upstream request failed")]
    UpstreamFetch(#[source] FetchError),

    /// Anything unexpected. The detail is logged, never returned.
    #[error("Proxy error")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameter | ProxyError::InvalidUrl => StatusCode::BAD_REQUEST,
            ProxyError::HostNotAllowed(_) => StatusCode::FORBIDDEN,
            ProxyError::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingParameter => "missing_parameter",
            ProxyError::InvalidUrl => "invalid_url",
            ProxyError::HostNotAllowed(_) => "host_not_allowed",
            ProxyError::UpstreamFetch(_) => "upstream_fetch",
            ProxyError::Internal(_) => "internal",
        }
    }

    /// Caller-facing response. The body is the error's display text only.
    pub fn to_proxy_response(&self) -> ProxyResponse {
        ProxyResponse::text(self.status(), format!("{}\n", self))
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), format!("{}\n", self)).into_response()
    }
}
