//! Serverless function adapter.
//!
//! Accepts a JSON event carrying `queryStringParameters` and `headers` and
//! produces `{ statusCode, headers, body, isBase64Encoded }`. The platform
//! only carries text bodies, so binary payloads travel base64-encoded.

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::Instrument;

use crate::http::request::ProxyQuery;
use crate::proxy::{ProxyResponse, ProxyService};

/// Inbound event. Missing maps are treated as empty.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl FunctionEvent {
    fn query(&self) -> ProxyQuery {
        let params = self.query_string_parameters.iter().flatten();
        ProxyQuery::from_pairs(params.map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Event headers as a `HeaderMap`. Names or values that are not valid
    /// HTTP are dropped.
    fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in self.headers.iter().flatten() {
            let parsed = HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes())
                .ok()
                .zip(HeaderValue::from_str(value).ok());
            match parsed {
                Some((name, value)) => {
                    map.append(name, value);
                }
                None => tracing::debug!(header = %name, "Dropping unparseable event header"),
            }
        }
        map
    }

    fn method_allowed(&self) -> bool {
        match self.http_method.as_deref() {
            None => true,
            Some(m) => m.eq_ignore_ascii_case(Method::GET.as_str()) || m.eq_ignore_ascii_case(Method::HEAD.as_str()),
        }
    }
}

/// Outbound function result.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl From<ProxyResponse> for FunctionResponse {
    fn from(response: ProxyResponse) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers.iter() {
            // The wire format is a JSON string map; opaque values cannot ride along.
            let Ok(value) = value.to_str() else {
                tracing::debug!(header = %name, "Dropping non-UTF-8 response header");
                continue;
            };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        // Non-media bodies that are not valid UTF-8 cannot travel as text either.
        let (body, is_base64_encoded) = match (response.binary, std::str::from_utf8(&response.body)) {
            (false, Ok(text)) => (text.to_string(), false),
            _ => (STANDARD.encode(&response.body), true),
        };

        Self {
            status_code: response.status.as_u16(),
            headers,
            body,
            is_base64_encoded,
        }
    }
}

/// Run one event through the proxy pipeline.
pub async fn invoke(proxy: &ProxyService, event: FunctionEvent) -> FunctionResponse {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("invocation", request_id = %request_id);

    let response = async move {
        if !event.method_allowed() {
            tracing::warn!(method = ?event.http_method, "Rejected non-GET invocation");
            return ProxyResponse::text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed\n");
        }
        proxy.handle(&event.query(), &event.header_map()).await
    }
    .instrument(span)
    .await;

    FunctionResponse::from(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::header;

    fn response(binary: bool, content_type: &'static str, body: &'static [u8]) -> ProxyResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        ProxyResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(body),
            binary,
        }
    }

    #[test]
    fn test_event_parsing_tolerates_nulls() {
        let event: FunctionEvent =
            serde_json::from_str(r#"{"queryStringParameters":null,"headers":null}"#).unwrap();
        assert!(event.query().url.is_none());
        assert!(event.header_map().is_empty());
        assert!(event.method_allowed());
    }

    #[test]
    fn test_event_query_and_headers() {
        let event: FunctionEvent = serde_json::from_str(
            r#"{
                "httpMethod": "GET",
                "queryStringParameters": {"u": "https://i.redd.it/a.png", "debug": "1"},
                "headers": {"User-Agent": "ua/1", "Authorization": "Bearer abc", "bad header": "x"}
            }"#,
        )
        .unwrap();

        let query = event.query();
        assert_eq!(query.u.as_deref(), Some("https://i.redd.it/a.png"));
        assert!(query.debug_enabled());

        let headers = event.header_map();
        assert_eq!(headers[header::USER_AGENT], "ua/1");
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_post_rejected() {
        let event = FunctionEvent {
            http_method: Some("POST".into()),
            ..Default::default()
        };
        assert!(!event.method_allowed());
    }

    #[test]
    fn test_binary_body_is_base64() {
        let out = FunctionResponse::from(response(true, "image/png", &[0x89, b'P', b'N', b'G']));
        assert!(out.is_base64_encoded);
        assert_eq!(STANDARD.decode(&out.body).unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert_eq!(out.headers["content-type"], "image/png");
    }

    #[test]
    fn test_text_body_stays_text() {
        let out = FunctionResponse::from(response(false, "application/json", b"{\"a\":1}"));
        assert!(!out.is_base64_encoded);
        assert_eq!(out.body, "{\"a\":1}");
        assert_eq!(out.status_code, 200);
    }

    #[test]
    fn test_invalid_utf8_text_falls_back_to_base64() {
        let out = FunctionResponse::from(response(false, "application/octet-stream", &[0xff, 0xfe]));
        assert!(out.is_base64_encoded);
        assert_eq!(STANDARD.decode(&out.body).unwrap(), vec![0xff, 0xfe]);
    }

    #[test]
    fn test_opaque_header_values_are_dropped() {
        let mut proxied = response(false, "text/plain", b"ok");
        proxied
            .headers
            .insert("x-opaque", HeaderValue::from_bytes(&[b'a', 0xff]).unwrap());
        proxied.headers.append("x-multi", HeaderValue::from_static("one"));
        proxied.headers.append("x-multi", HeaderValue::from_static("two"));

        let out = FunctionResponse::from(proxied);
        assert!(!out.headers.contains_key("x-opaque"));
        assert_eq!(out.headers["x-multi"], "one, two");
        assert_eq!(out.headers["content-type"], "text/plain");
    }

    #[test]
    fn test_serialized_shape() {
        let out = FunctionResponse::from(response(false, "text/plain", b"ok"));
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["isBase64Encoded"], false);
        assert_eq!(json["body"], "ok");
    }
}
