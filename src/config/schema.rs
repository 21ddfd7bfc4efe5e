//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the media proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Hosts the proxy is permitted to contact.
    pub allowlist: AllowlistConfig,

    /// Outbound header defaults.
    pub headers: HeaderConfig,

    /// Server-held OAuth credentials for the upstream API.
    pub oauth: OAuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Allowlist of upstream hosts.
///
/// An entry matches a host that equals it or is a subdomain of it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AllowlistConfig {
    pub hosts: Vec<String>,
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            hosts: [
                "reddit.com",
                "redd.it",
                "reddituploads.com",
                "imgur.com",
                "gfycat.com",
                "giphy.com",
                "redgifs.com",
                "streamable.com",
                "tenor.com",
                "r.jina.ai",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        }
    }
}

/// Defaults applied to outbound requests when the caller omits a header.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// User-Agent sent when the caller did not provide one.
    pub fallback_user_agent: String,

    /// Accept-Language sent when the caller did not provide one.
    pub default_accept_language: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            fallback_user_agent: concat!(
                "media-proxy/",
                env!("CARGO_PKG_VERSION"),
                " (+forwarding proxy)"
            )
            .to_string(),
            default_accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// OAuth credentials and endpoints for the upstream API.
///
/// All credential fields are optional. Which grant is used depends on which
/// of them are present (see `auth::grant`).
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub device_id: Option<String>,

    /// Token endpoint receiving the grant POST.
    pub token_url: String,

    /// Primary web hosts of the upstream. Requests to these hosts are
    /// rewritten to `oauth_host` when a server token is attached.
    pub web_hosts: Vec<String>,

    /// Host serving OAuth-authenticated API requests.
    pub oauth_host: String,

    /// Application name used in the API-etiquette User-Agent.
    pub app_name: String,

    /// Seconds before expiry at which a cached token is treated as invalid.
    pub refresh_margin_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            device_id: None,
            token_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            web_hosts: vec![
                "reddit.com".to_string(),
                "www.reddit.com".to_string(),
                "old.reddit.com".to_string(),
            ],
            oauth_host: "oauth.reddit.com".to_string(),
            app_name: "media-proxy".to_string(),
            refresh_margin_secs: 60,
        }
    }
}

impl OAuthConfig {
    /// True when a client id is present, i.e. some grant may be possible.
    pub fn has_credentials(&self) -> bool {
        self.client_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

// Secrets stay out of Debug output so configs can be logged safely.
impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(v: &Option<String>) -> &'static str {
            if v.is_some() { "Some([redacted])" } else { "None" }
        }
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &mask(&self.client_secret))
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("device_id", &mask(&self.device_id))
            .field("token_url", &self.token_url)
            .field("web_hosts", &self.web_hosts)
            .field("oauth_host", &self.oauth_host)
            .field("app_name", &self.app_name)
            .field("refresh_margin_secs", &self.refresh_margin_secs)
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security configuration.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Password checked by the `check_password` action. Unset disables it.
    pub app_password: Option<String>,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("app_password", &self.app_password.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}
