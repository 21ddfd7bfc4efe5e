//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. All errors are
//! collected so an operator sees every problem in one pass. Incomplete
//! OAuth credentials are not errors: the proxy degrades to another grant
//! or to unauthenticated forwarding, so they only produce warnings.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("allowlist.hosts is empty; the proxy would reject every request")]
    EmptyAllowlist,

    #[error("allowlist entry '{0}' must be a non-empty lowercase host without scheme or path")]
    AllowlistEntry(String),

    #[error("oauth.token_url '{0}' is not an absolute http(s) URL")]
    TokenUrl(String),

    #[error("oauth.oauth_host must not be empty")]
    OAuthHost,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.allowlist.hosts.is_empty() {
        errors.push(ValidationError::EmptyAllowlist);
    }
    for host in &config.allowlist.hosts {
        if !is_valid_host_entry(host) {
            errors.push(ValidationError::AllowlistEntry(host.clone()));
        }
    }

    let oauth = &config.oauth;
    match Url::parse(&oauth.token_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.host_str().is_some() => {}
        _ => errors.push(ValidationError::TokenUrl(oauth.token_url.clone())),
    }
    if oauth.oauth_host.trim().is_empty() {
        errors.push(ValidationError::OAuthHost);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Credential combinations that load but cannot be used as written.
pub fn credential_warnings(config: &ProxyConfig) -> Vec<String> {
    let oauth = &config.oauth;
    let mut warnings = Vec::new();

    if oauth.password.is_some() && oauth.username.is_none() {
        warnings.push("oauth.password is set without oauth.username; the password grant is skipped".to_string());
    }
    if !oauth.has_credentials() {
        for (name, value) in [
            ("client_secret", &oauth.client_secret),
            ("device_id", &oauth.device_id),
        ] {
            if value.is_some() {
                warnings.push(format!(
                    "oauth.{} is set without oauth.client_id; requests are forwarded unauthenticated",
                    name
                ));
            }
        }
    }

    warnings
}

fn is_valid_host_entry(host: &str) -> bool {
    !host.is_empty()
        && host == host.to_lowercase()
        && !host.starts_with('.')
        && !host.contains(['/', ':', ' ', '*'])
}
