//! Header manipulation.
//!
//! # Responsibilities
//! - Build outbound headers from an allowlist of inbound headers plus defaults
//! - Strip hop-by-hop headers from upstream responses
//!
//! # Design Decisions
//! - Outbound headers are built from scratch, never filtered from inbound
//! - Inbound `Authorization` is set first and never overwritten
//! - Cookies and host-specific headers are dropped by omission

use axum::http::header::{self, HeaderMap, HeaderValue};

use crate::config::HeaderConfig;
use crate::proxy::ProxyRequest;

/// Headers meaningful only to a single connection.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

const DEFAULT_ACCEPT: &str = "*/*";

/// Remove every hop-by-hop header from `headers`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// Builds outbound request headers deterministically.
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    fallback_user_agent: HeaderValue,
    default_accept_language: HeaderValue,
}

impl HeaderBuilder {
    pub fn from_config(config: &HeaderConfig) -> Self {
        let defaults = HeaderConfig::default();
        Self {
            fallback_user_agent: header_value_or(&config.fallback_user_agent, &defaults.fallback_user_agent),
            default_accept_language: header_value_or(
                &config.default_accept_language,
                &defaults.default_accept_language,
            ),
        }
    }

    /// Outbound headers for `request`, before any server credential.
    pub fn build(&self, request: &ProxyRequest) -> HeaderMap {
        let inbound = &request.client_headers;
        let mut outbound = HeaderMap::new();

        if let Some(auth) = &request.client_authorization {
            outbound.insert(header::AUTHORIZATION, auth.clone());
        }

        let user_agent = inbound
            .get(header::USER_AGENT)
            .cloned()
            .unwrap_or_else(|| self.fallback_user_agent.clone());
        outbound.insert(header::USER_AGENT, user_agent);

        let accept = inbound
            .get(header::ACCEPT)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ACCEPT));
        outbound.insert(header::ACCEPT, accept);

        let accept_language = inbound
            .get(header::ACCEPT_LANGUAGE)
            .cloned()
            .unwrap_or_else(|| self.default_accept_language.clone());
        outbound.insert(header::ACCEPT_LANGUAGE, accept_language);

        let referer = inbound.get(header::REFERER).cloned().or_else(|| {
            HeaderValue::from_str(&request.target.origin().ascii_serialization()).ok()
        });
        if let Some(referer) = referer {
            outbound.insert(header::REFERER, referer);
        }

        outbound
    }
}

fn header_value_or(value: &str, fallback: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| {
        tracing::warn!(value = %value, "Configured header value is invalid, using default");
        HeaderValue::from_str(fallback).unwrap_or_else(|_| HeaderValue::from_static(""))
    })
}
