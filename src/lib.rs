//! Media and feed forwarding proxy.
//!
//! Forwards `GET` calls to an allowlisted set of media and feed hosts,
//! attaching a server-held OAuth bearer token for the upstream API when the
//! caller brings none.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;
pub mod transport;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::ProxyService;
