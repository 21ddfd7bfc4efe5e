//! Server-side credential lifecycle.
//!
//! # States
//! ```text
//! NoToken → Valid            successful acquisition
//! Valid → NoToken            now >= expires_at - refresh_margin
//! NoToken → NoToken          acquisition failed (logged, request goes out unauthenticated)
//! ```
//!
//! # Design Decisions
//! - One manager per upstream identity, constructed once and injected
//! - Failures never propagate; the next request simply tries again
//! - Acquisition is single-flight: waiters re-check the cache after the lock

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::auth::grant::{api_user_agent, basic_auth_header, Grant};
use crate::auth::token::{CachedToken, Clock, SystemClock, TokenCache};
use crate::config::OAuthConfig;
use crate::observability::metrics;

/// Why a token could not be obtained.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("token endpoint returned {status}: {snippet}")]
    Status { status: StatusCode, snippet: String },

    #[error("token response malformed: {0}")]
    Malformed(String),
}

/// Everything the token endpoint needs for one acquisition.
#[derive(Clone)]
pub struct TokenRequest<'a> {
    pub grant: &'a Grant,
    /// `Basic …` value.
    pub authorization: &'a str,
    pub user_agent: &'a str,
}

/// A freshly issued token.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in_secs: u64,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &"[redacted]")
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// The upstream's OAuth token endpoint.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn request_token(&self, request: TokenRequest<'_>) -> Result<IssuedToken, TokenError>;
}

#[derive(Deserialize)]
struct TokenResponseBody {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

/// Token endpoint reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpTokenEndpoint {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn request_token(&self, request: TokenRequest<'_>) -> Result<IssuedToken, TokenError> {
        let response = self
            .client
            .post(&self.url)
            .header(header::AUTHORIZATION, request.authorization)
            .header(header::USER_AGENT, request.user_agent)
            .form(&request.grant.form_params())
            .send()
            .await
            .map_err(TokenError::Transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(TokenError::Transport)?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(TokenError::Status {
                status,
                snippet: text.chars().take(200).collect(),
            });
        }

        let parsed: TokenResponseBody =
            serde_json::from_slice(&body).map_err(|e| TokenError::Malformed(e.to_string()))?;
        match (parsed.access_token, parsed.expires_in) {
            (Some(access_token), Some(expires_in_secs)) if !access_token.is_empty() => Ok(IssuedToken {
                access_token,
                expires_in_secs,
            }),
            _ => Err(TokenError::Malformed(
                parsed
                    .error
                    .map(|e| format!("error={}", e))
                    .unwrap_or_else(|| "missing access_token or expires_in".to_string()),
            )),
        }
    }
}

/// Acquires, caches and supplies the upstream bearer token.
pub struct CredentialManager {
    grant: Option<Grant>,
    authorization: String,
    user_agent: String,
    refresh_margin_ms: u64,
    cache: TokenCache,
    endpoint: Arc<dyn TokenEndpoint>,
    clock: Arc<dyn Clock>,
    refresh_lock: Mutex<()>,
}

impl CredentialManager {
    pub fn new(config: &OAuthConfig, endpoint: Arc<dyn TokenEndpoint>, clock: Arc<dyn Clock>) -> Self {
        let grant = Grant::select(config);
        let authorization = config
            .client_id
            .as_deref()
            .map(|id| basic_auth_header(id, config.client_secret.as_deref()))
            .unwrap_or_default();

        match &grant {
            Some(g) => tracing::info!(grant = g.name(), "Server-side OAuth credentials configured"),
            None => tracing::info!("No server-side OAuth credentials configured"),
        }

        Self {
            grant,
            authorization,
            user_agent: api_user_agent(config),
            refresh_margin_ms: config.refresh_margin_secs.saturating_mul(1000),
            cache: TokenCache::new(),
            endpoint,
            clock,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Manager backed by the real token endpoint and system clock.
    pub fn from_config(config: &OAuthConfig, client: reqwest::Client) -> Self {
        let endpoint = Arc::new(HttpTokenEndpoint::new(client, config.token_url.clone()));
        Self::new(config, endpoint, Arc::new(SystemClock))
    }

    /// True when some grant can be attempted.
    pub fn is_configured(&self) -> bool {
        self.grant.is_some()
    }

    /// User-Agent used for the token endpoint and server-authenticated calls.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Currently cached token, valid or not.
    pub fn cached(&self) -> Option<Arc<CachedToken>> {
        self.cache.get()
    }

    /// A valid bearer token, acquiring one if needed.
    ///
    /// Returns `None` when no grant is configured or acquisition failed.
    pub async fn token(&self) -> Option<String> {
        let grant = self.grant.as_ref()?;

        if let Some(token) = self.cache.valid_token(self.clock.now_ms(), self.refresh_margin_ms) {
            return Some(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited.
        if let Some(token) = self.cache.valid_token(self.clock.now_ms(), self.refresh_margin_ms) {
            return Some(token);
        }

        tracing::info!(grant = grant.name(), "Requesting upstream OAuth token");
        let request = TokenRequest {
            grant,
            authorization: &self.authorization,
            user_agent: &self.user_agent,
        };

        match self.endpoint.request_token(request).await {
            Ok(issued) => {
                let expires_at_ms = self
                    .clock
                    .now_ms()
                    .saturating_add(issued.expires_in_secs.saturating_mul(1000));
                self.cache.store(CachedToken {
                    token: issued.access_token.clone(),
                    expires_at_ms,
                });
                metrics::record_token_acquisition("success");
                tracing::info!(
                    grant = grant.name(),
                    expires_in = issued.expires_in_secs,
                    "Fetched new upstream token"
                );
                Some(issued.access_token)
            }
            Err(e) => {
                metrics::record_token_acquisition("failure");
                tracing::warn!(grant = grant.name(), error = %e, "Token acquisition failed, proceeding unauthenticated");
                None
            }
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("grant", &self.grant)
            .field("refresh_margin_ms", &self.refresh_margin_ms)
            .field("cached", &self.cache.get())
            .finish()
    }
}
