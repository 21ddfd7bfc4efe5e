//! Application password check (`_action=check_password`).
//!
//! Lets the client unlock its UI against a server-held password sent in the
//! `x-app-password` header. Independent of the forwarding pipeline.

use axum::http::{HeaderMap, StatusCode};
use serde_json::json;

use crate::proxy::ProxyResponse;

pub const PASSWORD_HEADER: &str = "x-app-password";
pub const CHECK_PASSWORD_ACTION: &str = "check_password";

/// Outcome of a password check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// No password configured on the server.
    NotConfigured,
    Accepted,
    Rejected,
}

impl PasswordCheck {
    pub fn evaluate(expected: Option<&str>, headers: &HeaderMap) -> Self {
        let Some(expected) = expected.filter(|p| !p.is_empty()) else {
            return PasswordCheck::NotConfigured;
        };
        let provided = headers
            .get(PASSWORD_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        if constant_time_eq(provided, expected.as_bytes()) {
            PasswordCheck::Accepted
        } else {
            PasswordCheck::Rejected
        }
    }

    pub fn to_proxy_response(self) -> ProxyResponse {
        match self {
            PasswordCheck::NotConfigured => ProxyResponse::json(
                StatusCode::NOT_IMPLEMENTED,
                &json!({ "success": false, "message": "APP_PASSWORD not configured on server" }),
            ),
            PasswordCheck::Accepted => ProxyResponse::json(StatusCode::OK, &json!({ "success": true })),
            PasswordCheck::Rejected => ProxyResponse::json(
                StatusCode::FORBIDDEN,
                &json!({ "success": false, "message": "invalid password" }),
            ),
        }
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
