//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{credential_warnings, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Values from the file take precedence; credentials it leaves unset are
/// filled from the environment. A missing file yields defaults plus
/// environment.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)?
    } else {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        ProxyConfig::default()
    };

    apply_env_fallbacks(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;
    for warning in credential_warnings(&config) {
        tracing::warn!(%warning, "Incomplete OAuth credentials");
    }

    Ok(config)
}

/// Fill unset fields from environment-style lookups.
///
/// `PORT` only applies when the listener address is still the default.
pub fn apply_env_fallbacks<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    let oauth = &mut config.oauth;
    for (slot, key) in [
        (&mut oauth.client_id, "REDDIT_CLIENT_ID"),
        (&mut oauth.client_secret, "REDDIT_CLIENT_SECRET"),
        (&mut oauth.username, "REDDIT_USERNAME"),
        (&mut oauth.password, "REDDIT_PASSWORD"),
        (&mut oauth.device_id, "REDDIT_DEVICE_ID"),
    ] {
        if slot.is_none() {
            *slot = get(key);
        }
    }

    if config.security.app_password.is_none() {
        config.security.app_password = get("APP_PASSWORD");
    }

    let default_bind = crate::config::schema::ListenerConfig::default().bind_address;
    if config.listener.bind_address == default_bind {
        if let Some(port) = get("PORT").and_then(|p| p.parse::<u16>().ok()) {
            config.listener.bind_address = format!("0.0.0.0:{}", port);
        }
    }
}
