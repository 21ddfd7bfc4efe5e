//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the proxy and health handlers
//! - Wire up middleware (request ID, tracing, panic recovery)
//! - Hand the raw upstream bytes back to the client unchanged
//! - Drain in-flight calls on shutdown

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{ProxyQuery, X_REQUEST_ID};
use crate::proxy::{ProxyResponse, ProxyService};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ProxyService>,
}

/// HTTP front end for the media proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server around an already-assembled proxy pipeline.
    pub fn new(config: ProxyConfig, proxy: Arc<ProxyService>) -> Self {
        let router = Self::build_router(AppState { proxy });
        Self { router, config }
    }

    /// Create a server whose pipeline talks to the real upstreams.
    pub fn from_config(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let proxy = Arc::new(ProxyService::from_config(&config)?);
        Ok(Self::new(config, proxy))
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/api/proxy", get(proxy_handler))
            .route("/proxy", get(proxy_handler))
            .route("/healthz", get(health_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(make_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CatchPanicLayer::custom(handle_panic)),
            )
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            allowlist = self.config.allowlist.hosts.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn make_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Proxy error\n").into_response()
}

async fn proxy_handler(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Response {
    state.proxy.handle(&query, &headers).await.into_response()
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, [(header::CACHE_CONTROL, "no-store")], "ok\n")
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
