//! Proxy core subsystem.
//!
//! # Data Flow
//! ```text
//! transport adapter (axum route, serverless event)
//!     → service.rs (validate → headers → token → rewrite → fetch → translate)
//!     → types.rs (ProxyResponse, raw bytes + binary flag)
//!     → transport adapter encodes for its wire
//! ```
//!
//! # Design Decisions
//! - The core never sees transport types beyond `HeaderMap` and `StatusCode`
//! - Every failure maps to exactly one response; nothing escapes as a panic or error
//! - Proxy-generated error bodies never include internal detail

pub mod error;
pub mod service;
pub mod types;

pub use error::ProxyError;
pub use service::ProxyService;
pub use types::{ProxyRequest, ProxyResponse, UpstreamResponse};
