//! Upstream host allowlist.
//!
//! # Responsibilities
//! - Hold the set of hosts the proxy may contact
//! - Match a host by equality or as a subdomain of an entry
//!
//! # Design Decisions
//! - Host matching is case-insensitive (entries and hosts lowercased)
//! - Suffix match requires a dot boundary: `evilreddit.com` does not match `reddit.com`
//! - Immutable after construction (thread-safe without locks)

use crate::config::AllowlistConfig;

/// Static set of permitted hostnames and domain suffixes.
#[derive(Debug, Clone)]
pub struct Allowlist {
    entries: Vec<String>,
}

impl Allowlist {
    /// Create an allowlist. Entries are normalized to lowercase.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|e| e.into().trim().trim_end_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AllowlistConfig) -> Self {
        Self::new(config.hosts.iter().cloned())
    }

    /// Returns true if `host` equals an entry or ends with `"." + entry`.
    pub fn is_allowed(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.entries.iter().any(|entry| {
            host == *entry
                || (host.len() > entry.len()
                    && host.ends_with(entry.as_str())
                    && host.as_bytes()[host.len() - entry.len() - 1] == b'.')
        })
    }
}
