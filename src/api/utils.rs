//! API utility functions
//!
//! Pure, stateless helpers for HTTP request processing, kept out of
//! services.rs so they can be unit tested.

use axum::body::Body;
use axum::http::{HeaderMap, header};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// Parses and validates Content-Type header for application/json
///
/// Accepts:
/// - `application/json`
/// - `application/json; charset=utf-8`
///
/// Rejects:
/// - `application/jsonp`
/// - `application/json-patch+json`
/// - `text/json`
/// - Malformed media types
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type
        .parse()
        .map_err(|_| ApiError::InvalidPayload(format!("invalid Content-Type: {content_type}")))?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Read a whole body, failing with 413 once it grows past `max_size`
pub async fn read_body(body: Body, max_size: usize) -> Result<Bytes, ApiError> {
    match Limited::new(body, max_size).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::PayloadTooLarge(max_size))
        }
        Err(err) => Err(ApiError::Internal(err.to_string())),
    }
}

/// Decode a JSON management request after checking its Content-Type
pub fn json_body<T: DeserializeOwned>(headers: &HeaderMap, body: &[u8]) -> Result<T, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;

    Ok(serde_json::from_slice(body)?)
}

/// `scheme://host` the caller used to reach us, if the Host header is present
pub fn request_base_url(headers: &HeaderMap) -> Option<String> {
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())?;

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| *v == "http" || *v == "https")
        .unwrap_or("http");

    Some(format!("{scheme}://{host}"))
}

/// Bound a caller-supplied list limit
pub fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_content_type_valid() {
        assert!(parse_content_type("application/json").is_ok());
        assert!(parse_content_type("application/json; charset=utf-8").is_ok());
        assert!(parse_content_type("application/json; charset=UTF-8").is_ok());
    }

    #[test]
    fn test_parse_content_type_invalid() {
        assert!(parse_content_type("application/jsonp").is_err());
        assert!(parse_content_type("application/json-patch+json").is_err());
        assert!(parse_content_type("text/json").is_err());
        assert!(parse_content_type("text/plain").is_err());
        assert!(parse_content_type("invalid").is_err());
        assert!(parse_content_type("").is_err());
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let bytes = read_body(Body::from(vec![1u8; 1000]), 1000).await.unwrap();
        assert_eq!(bytes.len(), 1000);
    }

    #[tokio::test]
    async fn test_read_body_too_large() {
        let result = read_body(Body::from(vec![0u8; 1001]), 1000).await;
        match result {
            Err(ApiError::PayloadTooLarge(limit)) => assert_eq!(limit, 1000),
            other => panic!("Expected PayloadTooLarge error, got {other:?}"),
        }
    }

    #[test]
    fn test_json_body_requires_content_type() {
        let headers = HeaderMap::new();
        let result: Result<serde_json::Value, _> = json_body(&headers, b"{}");
        assert!(matches!(result, Err(ApiError::InvalidPayload(_))));
    }

    #[test]
    fn test_request_base_url() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_base_url(&headers), None);

        headers.insert(header::HOST, HeaderValue::from_static("localhost:3001"));
        assert_eq!(
            request_base_url(&headers).as_deref(),
            Some("http://localhost:3001")
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("abc.tunnel.dev"));
        assert_eq!(
            request_base_url(&headers).as_deref(),
            Some("https://abc.tunnel.dev")
        );
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 50, 500), 50);
        assert_eq!(clamp_limit(Some(0), 50, 500), 1);
        assert_eq!(clamp_limit(Some(10_000), 50, 500), 500);
    }
}
