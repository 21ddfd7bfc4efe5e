//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform the upstream response for the caller
//! - Strip hop-by-hop headers, add CORS and media cache hints
//! - Decide whether the body is binary (transport adapters encode it)
//! - Replace failed bodies with a short snippet in debug mode
//!
//! # Design Decisions
//! - Upstream status is always forwarded; the proxy never reinterprets it
//! - Bodies are never rewritten outside debug mode
//! - Content-Length is dropped; every transport recomputes it

use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;

use crate::proxy::{ProxyResponse, UpstreamResponse};
use crate::security::headers::strip_hop_by_hop;
use crate::security::redact::redact_headers;

/// Cache hint for successful media responses.
pub const MEDIA_CACHE_CONTROL: &str = "public, max-age=3600";

/// Maximum body bytes included in a debug snippet.
pub const DEBUG_SNIPPET_LIMIT: usize = 4096;

const LOG_SNIPPET_LIMIT: usize = 200;

const MEDIA_PREFIXES: [&str; 3] = ["image/", "video/", "audio/"];

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// True for `image/*`, `video/*` and `audio/*` responses.
pub fn is_media(headers: &HeaderMap) -> bool {
    let ct = content_type(headers);
    MEDIA_PREFIXES.iter().any(|p| ct.starts_with(p))
}

/// True when the body must be treated as opaque bytes.
pub fn is_binary(headers: &HeaderMap) -> bool {
    let attachment = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("attachment"));
    is_media(headers) || attachment
}

/// At most `limit` bytes of `body` as text, never splitting a UTF-8 sequence.
pub fn body_snippet(body: &[u8], limit: usize) -> String {
    let mut end = body.len().min(limit);
    while end > 0 && end < body.len() && body[end] & 0xC0 == 0x80 {
        end -= 1;
    }
    String::from_utf8_lossy(&body[..end]).into_owned()
}

/// Maps upstream responses into caller-facing responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseTranslator;

impl ResponseTranslator {
    pub fn translate(&self, upstream: UpstreamResponse, debug: bool) -> ProxyResponse {
        let UpstreamResponse { status, mut headers, body } = upstream;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                headers = ?redact_headers(&headers),
                snippet = %body_snippet(&body, LOG_SNIPPET_LIMIT),
                "Upstream returned non-success status"
            );
            if debug {
                return Self::debug_snippet(status, &body);
            }
        }

        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);

        let binary = is_binary(&headers);

        if status.is_success() {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            if is_media(&headers) && !headers.contains_key(header::CACHE_CONTROL) {
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(MEDIA_CACHE_CONTROL));
            }
        }

        ProxyResponse {
            status,
            headers,
            body,
            binary,
        }
    }

    /// Plain-text diagnostic: status line first, then the start of the body.
    fn debug_snippet(status: StatusCode, body: &[u8]) -> ProxyResponse {
        ProxyResponse::text(
            status,
            format!("{}\n\n{}", status, body_snippet(body, DEBUG_SNIPPET_LIMIT)),
        )
    }
}
