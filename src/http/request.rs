//! Request validation.
//!
//! # Responsibilities
//! - Extract the target URL from the query (`url`, alias `u`)
//! - Decode it leniently and parse it as an absolute URL
//! - Check the target host against the allowlist
//! - Produce an immutable `ProxyRequest` for the rest of the pipeline
//!
//! # Design Decisions
//! - Fail closed: nothing touches the network until the allowlist passes
//! - A value that fails percent-decoding is used as-is rather than rejected
//! - Only http and https targets are accepted

use axum::http::{header, HeaderMap};
use serde::Deserialize;
use url::Url;

use crate::proxy::{ProxyError, ProxyRequest};
use crate::routing::Allowlist;

/// Correlation header set on every inbound request and echoed back.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Query parameters understood by the proxy endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
    /// Alias for `url`.
    pub u: Option<String>,
    pub debug: Option<String>,
    #[serde(rename = "_action")]
    pub action: Option<String>,
}

impl ProxyQuery {
    /// Build a query from `(name, value)` pairs, e.g. a serverless event map.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();
        for (name, value) in pairs {
            let slot = match name {
                "url" => &mut query.url,
                "u" => &mut query.u,
                "debug" => &mut query.debug,
                "_action" => &mut query.action,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        query
    }

    fn raw_target(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|v| !v.is_empty())
            .or_else(|| self.u.as_deref().filter(|v| !v.is_empty()))
    }

    /// `debug=1` or `debug=true`.
    pub fn debug_enabled(&self) -> bool {
        matches!(self.debug.as_deref(), Some("1") | Some("true"))
    }
}

/// Validates inbound calls before any network activity.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    allowlist: Allowlist,
}

impl RequestValidator {
    pub fn new(allowlist: Allowlist) -> Self {
        Self { allowlist }
    }

    pub fn validate(&self, query: &ProxyQuery, headers: &HeaderMap) -> Result<ProxyRequest, ProxyError> {
        let raw = query.raw_target().ok_or(ProxyError::MissingParameter)?;

        let decoded = decode_lenient(raw);
        let target = Url::parse(decoded.trim()).map_err(|_| ProxyError::InvalidUrl)?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidUrl);
        }
        let host = target
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(ProxyError::InvalidUrl)?
            .to_lowercase();

        if !self.allowlist.is_allowed(&host) {
            return Err(ProxyError::HostNotAllowed(host));
        }

        let client_authorization = headers
            .get(header::AUTHORIZATION)
            .filter(|v| !v.as_bytes().iter().all(u8::is_ascii_whitespace))
            .cloned();

        Ok(ProxyRequest {
            target,
            host,
            debug: query.debug_enabled(),
            client_authorization,
            client_headers: headers.clone(),
        })
    }
}

/// Percent-decode `raw`, falling back to the raw string if decoding fails.
pub fn decode_lenient(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn validator() -> RequestValidator {
        RequestValidator::new(Allowlist::new(["reddit.com", "redd.it"]))
    }

    fn query(url: &str) -> ProxyQuery {
        ProxyQuery {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_parameter() {
        let err = validator().validate(&ProxyQuery::default(), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ProxyError::MissingParameter));

        let err = validator().validate(&query(""), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ProxyError::MissingParameter));
    }

    #[test]
    fn test_invalid_url() {
        for bad in ["not a url", "/r/pics.json", "ftp://reddit.com/file", "mailto:a@reddit.com"] {
            let err = validator().validate(&query(bad), &HeaderMap::new()).unwrap_err();
            assert!(matches!(err, ProxyError::InvalidUrl), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_encoded_and_plain_targets() {
        let plain = validator()
            .validate(&query("https://www.reddit.com/r/earth/hot.json?limit=25"), &HeaderMap::new())
            .unwrap();
        let encoded = validator()
            .validate(
                &query("https%3A%2F%2Fwww.reddit.com%2Fr%2Fearth%2Fhot.json%3Flimit%3D25"),
                &HeaderMap::new(),
            )
            .unwrap();
        assert_eq!(plain.target, encoded.target);
        assert_eq!(plain.host, "www.reddit.com");
    }

    #[test]
    fn test_malformed_encoding_falls_back_to_raw() {
        // %E9 alone is not valid UTF-8 once decoded.
        assert_eq!(decode_lenient("https://i.redd.it/a%E9.png"), "https://i.redd.it/a%E9.png");
        let req = validator().validate(&query("https://i.redd.it/a%E9.png"), &HeaderMap::new()).unwrap();
        assert_eq!(req.host, "i.redd.it");
    }

    #[test]
    fn test_host_not_allowed() {
        let err = validator()
            .validate(&query("https://EVIL.example/steal"), &HeaderMap::new())
            .unwrap_err();
        match err {
            ProxyError::HostNotAllowed(host) => assert_eq!(host, "evil.example"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_u_alias_and_debug_flag() {
        let q = ProxyQuery::from_pairs([("u", "https://i.redd.it/x.jpg"), ("debug", "true")]);
        let req = validator().validate(&q, &HeaderMap::new()).unwrap();
        assert!(req.debug);

        let q = ProxyQuery::from_pairs([("url", "https://i.redd.it/x.jpg"), ("debug", "yes")]);
        assert!(!validator().validate(&q, &HeaderMap::new()).unwrap().debug);
    }

    #[test]
    fn test_client_authorization_captured() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer client-token"));
        let req = validator().validate(&query("https://oauth.reddit.com/api/v1/me"), &headers).unwrap();
        assert_eq!(req.client_authorization.unwrap(), "Bearer client-token");

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(""));
        let req = validator().validate(&query("https://oauth.reddit.com/api/v1/me"), &headers).unwrap();
        assert!(req.client_authorization.is_none());
    }
}
