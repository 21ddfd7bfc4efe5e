//! Outbound target rewriting for server-authenticated requests.
//!
//! The upstream serves OAuth-authenticated API calls from a dedicated host.
//! When the proxy attaches its own token to a request aimed at one of the
//! upstream's web hosts, the request is redirected to that host with path and
//! query untouched. Requests carrying a caller-supplied `Authorization` are
//! never rewritten.

use url::Url;

use crate::config::OAuthConfig;

/// How the outbound `Authorization` header was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// No credential attached.
    None,
    /// Copied from the inbound request.
    Client,
    /// Acquired by the proxy's credential manager.
    Server,
}

/// Rewrites web-host targets to the OAuth host.
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    web_hosts: Vec<String>,
    oauth_host: String,
}

impl UrlRewriter {
    pub fn new<I, S>(web_hosts: I, oauth_host: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            web_hosts: web_hosts.into_iter().map(|h| h.into().to_lowercase()).collect(),
            oauth_host: oauth_host.into().to_lowercase(),
        }
    }

    pub fn from_config(config: &OAuthConfig) -> Self {
        Self::new(config.web_hosts.iter().cloned(), config.oauth_host.clone())
    }

    /// True for the upstream's primary web hosts (not its OAuth host).
    pub fn is_web_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        host != self.oauth_host && self.web_hosts.iter().any(|h| *h == host)
    }

    /// True for any host belonging to the upstream identity.
    pub fn is_upstream_host(&self, host: &str) -> bool {
        host.eq_ignore_ascii_case(&self.oauth_host) || self.is_web_host(host)
    }

    /// Return the URL to fetch for `target` given how auth was attached.
    pub fn rewrite(&self, target: &Url, auth: AuthSource) -> Url {
        if auth != AuthSource::Server {
            return target.clone();
        }
        let Some(host) = target.host_str() else {
            return target.clone();
        };
        if !self.is_web_host(host) {
            return target.clone();
        }

        let mut rewritten = target.clone();
        match rewritten.set_host(Some(&self.oauth_host)) {
            Ok(()) => {
                tracing::debug!(from = %host, to = %self.oauth_host, "Rewrote target to OAuth host");
                rewritten
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to rewrite to OAuth host, using original target");
                target.clone()
            }
        }
    }
}
