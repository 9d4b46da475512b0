//! API utility functions
//!
//! Helpers shared by handlers: page-size clamping, header parsing and the
//! common message envelope.

use axum::http::{header, HeaderMap};
use serde::Serialize;

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Maximum page size for listings
pub const MAX_PAGE_SIZE: usize = 50;

/// Simple `{message}` response body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message
    pub message: String,
}

impl MessageResponse {
    /// Create a message response
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parse a page-size query value and clamp it to `1..=MAX_PAGE_SIZE`
///
/// Missing or unparseable values fall back to the default.
pub fn clamp_page_size(value: Option<&str>) -> usize {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|v| v.clamp(1, MAX_PAGE_SIZE as i64) as usize)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

/// Header value as a string, if present and valid UTF-8
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Token from the `Authorization` header, with any `Bearer ` prefix removed
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = header_str(headers, header::AUTHORIZATION.as_str())?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Client IP from proxy headers
///
/// Uses the first `X-Forwarded-For` hop, then `X-Real-IP`.
pub fn client_ip(headers: &HeaderMap) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, "x-real-ip").map(str::trim))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(None), 10);
        assert_eq!(clamp_page_size(Some("25")), 25);
        assert_eq!(clamp_page_size(Some("0")), 1);
        assert_eq!(clamp_page_size(Some("-4")), 1);
        assert_eq!(clamp_page_size(Some("500")), 50);
        assert_eq!(clamp_page_size(Some("ten")), 10);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123".to_string()));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("raw-token"));
        assert_eq!(bearer_token(&headers), Some("raw-token".to_string()));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "");

        headers.insert("x-real-ip", HeaderValue::from_static("10.1.1.1"));
        assert_eq!(client_ip(&headers), "10.1.1.1");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }
}
