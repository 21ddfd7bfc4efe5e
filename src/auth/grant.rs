//! OAuth grant selection and token request encoding.

use base64::Engine;

use crate::config::OAuthConfig;

/// Grant type for installed (non-confidential) clients identified by device.
pub const INSTALLED_CLIENT_GRANT: &str = "https://oauth.reddit.com/grants/installed_client";

/// The grant the proxy will use to obtain a token.
#[derive(Clone, PartialEq, Eq)]
pub enum Grant {
    /// Script-app password grant scoped to read access.
    Password { username: String, password: String },
    /// Application-only token from client id and secret.
    ClientCredentials,
    /// Application-only token for a client without a secret.
    InstalledClient { device_id: String },
}

impl Grant {
    /// Pick a grant from configured credentials.
    ///
    /// Priority: username+password, then client secret, then device id.
    /// `None` when no client id is configured or nothing else qualifies.
    pub fn select(config: &OAuthConfig) -> Option<Self> {
        if !config.has_credentials() {
            return None;
        }
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

        if let (Some(username), Some(password)) = (present(&config.username), present(&config.password)) {
            return Some(Grant::Password { username, password });
        }
        if present(&config.client_secret).is_some() {
            return Some(Grant::ClientCredentials);
        }
        present(&config.device_id).map(|device_id| Grant::InstalledClient { device_id })
    }

    /// Label for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Grant::Password { .. } => "password",
            Grant::ClientCredentials => "client_credentials",
            Grant::InstalledClient { .. } => "installed_client",
        }
    }

    /// Form body fields for the token endpoint.
    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Grant::Password { username, password } => vec![
                ("grant_type", "password".to_string()),
                ("username", username.clone()),
                ("password", password.clone()),
                ("scope", "read".to_string()),
            ],
            Grant::ClientCredentials => vec![("grant_type", "client_credentials".to_string())],
            Grant::InstalledClient { device_id } => vec![
                ("grant_type", INSTALLED_CLIENT_GRANT.to_string()),
                ("device_id", device_id.clone()),
            ],
        }
    }
}

impl std::fmt::Debug for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grant::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
            Grant::ClientCredentials => f.write_str("ClientCredentials"),
            Grant::InstalledClient { .. } => f.write_str("InstalledClient"),
        }
    }
}

/// `Basic base64(id:secret)`, or `Basic base64(id:)` without a secret.
pub fn basic_auth_header(client_id: &str, client_secret: Option<&str>) -> String {
    let raw = format!("{}:{}", client_id, client_secret.unwrap_or_default());
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(raw.as_bytes())
    )
}

/// Descriptive User-Agent required by the upstream's API rules.
pub fn api_user_agent(config: &OAuthConfig) -> String {
    let version = env!("CARGO_PKG_VERSION");
    match config.username.as_deref().filter(|u| !u.is_empty()) {
        Some(user) => format!("script:{}:{} (by /u/{})", config.app_name, version, user),
        None => format!("{}/{}", config.app_name, version),
    }
}
