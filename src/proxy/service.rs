//! The forwarding pipeline shared by every transport.
//!
//! # Data Flow
//! ```text
//! ProxyQuery + inbound headers
//!     → RequestValidator (url, allowlist)
//!     → HeaderBuilder (outbound headers)
//!     → CredentialManager (server token, only without client auth)
//!     → UrlRewriter (web host → OAuth API host when server-authenticated)
//!     → Upstream (one GET)
//!     → ResponseTranslator
//!     → ProxyResponse
//! ```

use axum::http::header::{self, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::CredentialManager;
use crate::config::ProxyConfig;
use crate::http::request::{ProxyQuery, RequestValidator};
use crate::http::response::ResponseTranslator;
use crate::observability::metrics;
use crate::proxy::{ProxyError, ProxyRequest, ProxyResponse};
use crate::routing::{Allowlist, AuthSource, UrlRewriter};
use crate::security::password::CHECK_PASSWORD_ACTION;
use crate::security::{HeaderBuilder, PasswordCheck};
use crate::upstream::{build_client, HttpUpstream, Upstream};

/// One proxy instance: stateless apart from the shared token cache.
pub struct ProxyService {
    validator: RequestValidator,
    header_builder: HeaderBuilder,
    credentials: Arc<CredentialManager>,
    rewriter: UrlRewriter,
    upstream: Arc<dyn Upstream>,
    translator: ResponseTranslator,
    app_password: Option<String>,
}

impl ProxyService {
    /// Assemble the pipeline around the given credential manager and upstream.
    pub fn new(
        config: &ProxyConfig,
        credentials: Arc<CredentialManager>,
        upstream: Arc<dyn Upstream>,
    ) -> Self {
        Self {
            validator: RequestValidator::new(Allowlist::from_config(&config.allowlist)),
            header_builder: HeaderBuilder::from_config(&config.headers),
            credentials,
            rewriter: UrlRewriter::from_config(&config.oauth),
            upstream,
            translator: ResponseTranslator,
            app_password: config.security.app_password.clone(),
        }
    }

    /// Pipeline backed by real HTTP clients for fetches and tokens.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let credentials = Arc::new(CredentialManager::from_config(&config.oauth, build_client()?));
        let upstream = HttpUpstream::with_allowlist(Allowlist::from_config(&config.allowlist))?;
        Ok(Self::new(config, credentials, Arc::new(upstream)))
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Handle one call. Never fails: every error becomes a response.
    pub async fn handle(&self, query: &ProxyQuery, headers: &HeaderMap) -> ProxyResponse {
        if query.action.as_deref() == Some(CHECK_PASSWORD_ACTION) {
            return PasswordCheck::evaluate(self.app_password.as_deref(), headers).to_proxy_response();
        }

        let started = Instant::now();
        let response = match self.forward(query, headers).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    ProxyError::UpstreamFetch(source) => {
                        tracing::error!(error = %source, "Upstream fetch failed")
                    }
                    ProxyError::Internal(detail) => {
                        tracing::error!(detail = %detail, "Unexpected proxy failure")
                    }
                    other => tracing::warn!(reason = other.kind(), error = %other, "Rejected proxy request"),
                }
                metrics::record_rejection(e.kind());
                e.to_proxy_response()
            }
        };

        metrics::record_request(response.status.as_u16(), started);
        response
    }

    async fn forward(&self, query: &ProxyQuery, headers: &HeaderMap) -> Result<ProxyResponse, ProxyError> {
        let request = self.validator.validate(query, headers)?;
        let mut outbound = self.header_builder.build(&request);

        let auth = if request.client_authorization.is_some() {
            AuthSource::Client
        } else {
            self.attach_server_token(&request, &mut outbound).await?
        };

        let fetch_url = self.rewriter.rewrite(&request.target, auth);
        tracing::info!(
            host = %request.host,
            path = fetch_url.path(),
            auth = ?auth,
            rewritten = fetch_url.host_str() != request.target.host_str(),
            "Forwarding request"
        );

        let upstream = self
            .upstream
            .fetch(&fetch_url, outbound)
            .await
            .map_err(ProxyError::UpstreamFetch)?;

        Ok(self.translator.translate(upstream, request.debug))
    }

    /// Adds a server bearer token for upstream-family hosts when one is available.
    async fn attach_server_token(
        &self,
        request: &ProxyRequest,
        outbound: &mut HeaderMap,
    ) -> Result<AuthSource, ProxyError> {
        if !self.credentials.is_configured() || !self.rewriter.is_upstream_host(&request.host) {
            return Ok(AuthSource::None);
        }

        let Some(token) = self.credentials.token().await else {
            tracing::debug!(host = %request.host, "No server token available, forwarding unauthenticated");
            return Ok(AuthSource::None);
        };

        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ProxyError::Internal("issued token is not a valid header value".into()))?;
        outbound.insert(header::AUTHORIZATION, bearer);

        if !request.client_headers.contains_key(header::USER_AGENT) {
            let agent = HeaderValue::from_str(self.credentials.user_agent())
                .map_err(|_| ProxyError::Internal("api user agent is not a valid header value".into()))?;
            outbound.insert(header::USER_AGENT, agent);
        }

        Ok(AuthSource::Server)
    }
}

impl std::fmt::Debug for ProxyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyService")
            .field("validator", &self.validator)
            .field("rewriter", &self.rewriter)
            .field("credentials", &self.credentials)
            .field("password_gate", &self.app_password.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{IssuedToken, ManualClock, TokenEndpoint, TokenError, TokenRequest};
    use crate::proxy::UpstreamResponse;
    use crate::upstream::FetchError;
    use async_trait::async_trait;
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use url::Url;

    #[derive(Default)]
    struct RecordingUpstream {
        calls: Mutex<Vec<(Url, HeaderMap)>>,
    }

    impl RecordingUpstream {
        fn calls(&self) -> Vec<(Url, HeaderMap)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for RecordingUpstream {
        async fn fetch(&self, url: &Url, headers: HeaderMap) -> Result<UpstreamResponse, FetchError> {
            self.calls.lock().unwrap().push((url.clone(), headers));
            let mut response_headers = HeaderMap::new();
            response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Ok(UpstreamResponse {
                status: StatusCode::OK,
                headers: response_headers,
                body: Bytes::from_static(b"{\"data\":{}}"),
            })
        }
    }

    struct StaticEndpoint {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenEndpoint for StaticEndpoint {
        async fn request_token(&self, _request: TokenRequest<'_>) -> Result<IssuedToken, TokenError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TokenError::Malformed("no token".into()));
            }
            Ok(IssuedToken {
                access_token: "server-token".into(),
                expires_in_secs: 3600,
            })
        }
    }

    fn config(with_credentials: bool) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        if with_credentials {
            config.oauth.client_id = Some("client".into());
            config.oauth.client_secret = Some("secret".into());
        }
        config
    }

    fn service(config: &ProxyConfig, fail_token: bool) -> (ProxyService, Arc<RecordingUpstream>, Arc<StaticEndpoint>) {
        let endpoint = Arc::new(StaticEndpoint {
            calls: AtomicUsize::new(0),
            fail: fail_token,
        });
        let credentials = Arc::new(CredentialManager::new(
            &config.oauth,
            endpoint.clone(),
            Arc::new(ManualClock::new(1_000)),
        ));
        let upstream = Arc::new(RecordingUpstream::default());
        (ProxyService::new(config, credentials, upstream.clone()), upstream, endpoint)
    }

    fn query(url: &str) -> ProxyQuery {
        ProxyQuery {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_server_token_rewrites_web_host() {
        let config = config(true);
        let (service, upstream, endpoint) = service(&config, false);

        let response = service
            .handle(&query("https://www.reddit.com/r/pics/.json"), &HeaderMap::new())
            .await;

        assert_eq!(response.status, StatusCode::OK);
        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_str(), "https://oauth.reddit.com/r/pics/.json");
        assert_eq!(calls[0].1[header::AUTHORIZATION], "Bearer server-token");
        assert_eq!(calls[0].1[header::USER_AGENT], service.credentials().user_agent());
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_authorization_wins() {
        let config = config(true);
        let (service, upstream, endpoint) = service(&config, false);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer user-token"));

        service
            .handle(&query("https://www.reddit.com/r/pics/.json"), &headers)
            .await;

        let calls = upstream.calls();
        assert_eq!(calls[0].0.host_str(), Some("www.reddit.com"));
        assert_eq!(calls[0].1[header::AUTHORIZATION], "Bearer user-token");
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_failure_degrades_to_unauthenticated() {
        let config = config(true);
        let (service, upstream, _) = service(&config, true);

        let response = service
            .handle(&query("https://www.reddit.com/r/pics/.json"), &HeaderMap::new())
            .await;

        assert_eq!(response.status, StatusCode::OK);
        let calls = upstream.calls();
        assert_eq!(calls[0].0.host_str(), Some("www.reddit.com"));
        assert!(calls[0].1.get(header::AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_no_token_for_other_hosts() {
        let config = config(true);
        let (service, upstream, endpoint) = service(&config, false);

        service
            .handle(&query("https://i.imgur.com/abc.jpg"), &HeaderMap::new())
            .await;

        assert!(upstream.calls()[0].1.get(header::AUTHORIZATION).is_none());
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disallowed_host_never_fetched() {
        let config = config(true);
        let (service, upstream, _) = service(&config, false);

        let response = service
            .handle(&query("https://evil.example/x"), &HeaderMap::new())
            .await;

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_url_is_bad_request() {
        let config = config(false);
        let (service, upstream, _) = service(&config, false);

        let response = service.handle(&ProxyQuery::default(), &HeaderMap::new()).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body, Bytes::from_static(b"Missing url parameter\n"));
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_password_action_short_circuits() {
        let mut config = config(false);
        config.security.app_password = Some("hunter2".into());
        let (service, upstream, _) = service(&config, false);
        let mut headers = HeaderMap::new();
        headers.insert("x-app-password", HeaderValue::from_static("hunter2"));
        let query = ProxyQuery {
            action: Some(CHECK_PASSWORD_ACTION.into()),
            ..Default::default()
        };

        let response = service.handle(&query, &headers).await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(upstream.calls().is_empty());
    }
}
