//! The single outbound call.
//!
//! # Responsibilities
//! - Perform exactly one GET to the (possibly rewritten) target
//! - Surface network failures as `FetchError`
//! - Hand back any HTTP status, 4xx/5xx included, untouched
//!
//! # Design Decisions
//! - No proxy-imposed deadline and no retry
//! - Body buffered whole; the translator needs it to pick an encoding
//! - Redirects are followed only while every hop stays on the allowlist;
//!   the first off-list hop is handed back to the caller unfollowed

use async_trait::async_trait;
use axum::http::HeaderMap;
use reqwest::redirect::Policy;
use std::time::Instant;
use thiserror::Error;
use url::Url;

use crate::observability::metrics;
use crate::proxy::UpstreamResponse;
use crate::routing::Allowlist;

const MAX_REDIRECTS: usize = 10;

/// Network-level failure reaching the upstream.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("failed to read upstream body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Performs the outbound request.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, url: &Url, headers: HeaderMap) -> Result<UpstreamResponse, FetchError>;
}

/// Upstream reached with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Upstream whose client never leaves `allowlist` while following redirects.
    pub fn with_allowlist(allowlist: Allowlist) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(redirect_policy(allowlist))
            .build()?;
        Ok(Self::new(client))
    }
}

/// Follow a redirect only if its target host passes the allowlist.
fn redirect_policy(allowlist: Allowlist) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let host = attempt.url().host_str().map(str::to_lowercase);
        match host {
            Some(host) if allowlist.is_allowed(&host) => attempt.follow(),
            host => {
                tracing::warn!(
                    host = host.as_deref().unwrap_or("<none>"),
                    "Redirect leaves the allowlist, returning it unfollowed"
                );
                attempt.stop()
            }
        }
    })
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, url: &Url, headers: HeaderMap) -> Result<UpstreamResponse, FetchError> {
        let started = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(FetchError::Body)?;

        metrics::record_upstream_duration(status.as_u16(), started);
        tracing::debug!(status = %status, bytes = body.len(), "Upstream responded");

        Ok(UpstreamResponse { status, headers, body })
    }
}

/// HTTP client for token requests.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().build()
}
