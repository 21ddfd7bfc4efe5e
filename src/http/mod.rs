//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → request.rs (query extraction, url validation, allowlist)
//!     → proxy::ProxyService (headers, token, rewrite, fetch)
//!     → response.rs (hop-by-hop stripping, CORS, debug snippet)
//!     → raw bytes to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ProxyQuery, RequestValidator, X_REQUEST_ID};
pub use response::ResponseTranslator;
pub use server::{AppState, HttpServer};
