//! Normalization of inbound webhook calls into [`CapturedRequest`] records

use axum::http::{HeaderMap, Method, header};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// One inbound call, as recorded on its endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    /// Lower-cased names; repeated headers are joined with ", "
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    /// Single values as strings, repeated keys as arrays
    pub query: Map<String, Value>,
    pub source_address: Option<String>,
}

impl CapturedRequest {
    pub fn from_parts(
        method: &Method,
        headers: &HeaderMap,
        raw_query: Option<&str>,
        body: &[u8],
        peer: Option<SocketAddr>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            method: method.as_str().to_string(),
            headers: normalize_headers(headers),
            body: parse_body(headers, body),
            query: raw_query.map(parse_pairs).unwrap_or_default(),
            source_address: source_address(headers, peer),
        }
    }
}

pub fn normalize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut normalized: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        normalized
            .entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    normalized
}

/// Decode `a=1&b=2&a=3` style pairs. Undecodable input yields an empty map.
fn parse_pairs(raw: &str) -> Map<String, Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).unwrap_or_default();
    pairs_to_map(pairs)
}

fn pairs_to_map(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(key, Value::String(value));
            }
        }
    }
    map
}

/// Turn a raw body into a structured value according to its Content-Type
///
/// JSON is parsed, form bodies become maps, anything else is kept as lossy
/// UTF-8 text. An empty body is `null`. A body that claims JSON but does
/// not parse is kept as text rather than rejected.
pub fn parse_body(headers: &HeaderMap, body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }

    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok());

    let as_text = || Value::String(String::from_utf8_lossy(body).into_owned());

    match media_type {
        Some(m) if m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON) => {
            serde_json::from_slice(body).unwrap_or_else(|_| as_text())
        }
        Some(m) if m.type_() == mime::APPLICATION && m.subtype() == mime::WWW_FORM_URLENCODED => {
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
                .map(|pairs| Value::Object(pairs_to_map(pairs)))
                .unwrap_or_else(|_| as_text())
        }
        Some(_) => as_text(),
        None => serde_json::from_slice(body).unwrap_or_else(|_| as_text()),
    }
}

/// The endpoint-verification handshake: an object carrying a string
/// `challenge`, with `type` absent or `url_verification`
pub fn verification_challenge(body: &Value) -> Option<&str> {
    let object = body.as_object()?;
    let challenge = object.get("challenge")?.as_str()?;
    match object.get("type") {
        None => Some(challenge),
        Some(Value::String(kind)) if kind == "url_verification" => Some(challenge),
        Some(_) => None,
    }
}

/// First hop of X-Forwarded-For when present, otherwise the socket peer
fn source_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn headers_with(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_parse_body_json() {
        let body = parse_body(&headers_with("application/json"), br#"{"a":[1,2]}"#);
        assert_eq!(body, json!({"a": [1, 2]}));
    }

    #[test]
    fn test_parse_body_vendor_json_suffix() {
        let body = parse_body(
            &headers_with("application/vnd.github+json; charset=utf-8"),
            br#"{"action":"opened"}"#,
        );
        assert_eq!(body["action"], "opened");
    }

    #[test]
    fn test_parse_body_malformed_json_kept_as_text() {
        let body = parse_body(&headers_with("application/json"), b"{not json");
        assert_eq!(body, Value::String("{not json".to_string()));
    }

    #[test]
    fn test_parse_body_form() {
        let body = parse_body(
            &headers_with("application/x-www-form-urlencoded"),
            b"payload=%7B%7D&tag=a&tag=b",
        );
        assert_eq!(body, json!({"payload": "{}", "tag": ["a", "b"]}));
    }

    #[test]
    fn test_parse_body_plain_and_empty() {
        assert_eq!(
            parse_body(&headers_with("text/plain"), b"hello"),
            Value::String("hello".to_string())
        );
        assert_eq!(parse_body(&HeaderMap::new(), b""), Value::Null);
        assert_eq!(parse_body(&HeaderMap::new(), b"[1]"), json!([1]));
    }

    #[test]
    fn test_normalize_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("X-Trace", HeaderValue::from_static("a"));
        headers.append("x-trace", HeaderValue::from_static("b"));
        headers.insert("User-Agent", HeaderValue::from_static("GitHub-Hookshot/1"));

        let normalized = normalize_headers(&headers);
        assert_eq!(normalized["x-trace"], "a, b");
        assert_eq!(normalized["user-agent"], "GitHub-Hookshot/1");
    }

    #[test]
    fn test_verification_challenge_shapes() {
        assert_eq!(
            verification_challenge(&json!({"type": "url_verification", "challenge": "abc"})),
            Some("abc")
        );
        assert_eq!(verification_challenge(&json!({"challenge": "xyz"})), Some("xyz"));
        assert_eq!(
            verification_challenge(&json!({"type": "event_callback", "challenge": "abc"})),
            None
        );
        assert_eq!(verification_challenge(&json!({"challenge": 5})), None);
        assert_eq!(verification_challenge(&json!("challenge")), None);
    }

    #[test]
    fn test_source_address_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        assert_eq!(source_address(&headers, Some(peer)).as_deref(), Some("10.0.0.9"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(
            source_address(&headers, Some(peer)).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn test_from_parts_parses_query() {
        let captured = CapturedRequest::from_parts(
            &Method::PUT,
            &HeaderMap::new(),
            Some("ref=main&x=1&x=2"),
            b"",
            None,
        );
        assert_eq!(captured.method, "PUT");
        assert_eq!(captured.query["ref"], "main");
        assert_eq!(captured.query["x"], json!(["1", "2"]));
        assert!(captured.source_address.is_none());
    }
}
