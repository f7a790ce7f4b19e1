// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP request types and builder

use super::headers;
use crate::error::Result;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// HTTP request representation
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method
    pub method: Method,
    /// Request URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Option<Bytes>,
    /// Request timeout (None = transport default)
    pub timeout: Option<Duration>,
    /// Skip the CSRF step even for state-changing methods
    pub csrf_exempt: bool,
    /// Skip the auth-freshness step (anonymous endpoints)
    pub is_public: bool,
}

impl Request {
    /// Create a new GET request
    pub fn get(url: impl AsRef<str>) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    /// Create a new POST request
    pub fn post(url: impl AsRef<str>) -> Result<Self> {
        Self::new(Method::POST, url)
    }

    /// Create a new request with arbitrary method
    pub fn new(method: Method, url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            method,
            url: Url::parse(url.as_ref())?,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            csrf_exempt: false,
            is_public: false,
        })
    }

    /// Set a header
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Set the request body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set JSON body
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self> {
        let json = serde_json::to_vec(data)?;
        self.body = Some(Bytes::from(json));
        self = self.header(headers::CONTENT_TYPE, "application/json");
        Ok(self)
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Mark the request as not needing a CSRF token
    pub fn csrf_exempt(mut self, exempt: bool) -> Self {
        self.csrf_exempt = exempt;
        self
    }

    /// Mark the request as public (no access token needed)
    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Get the URL as string
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    /// Get a header value
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get the origin (scheme, host and explicit port)
    pub fn origin(&self) -> String {
        origin_of(&self.url)
    }
}

/// Origin of a URL in `scheme://host[:port]` form.
///
/// Default ports are omitted, so `https://example.com:443/x` and
/// `https://example.com/y` share an origin.
pub fn origin_of(url: &Url) -> String {
    format!(
        "{}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or(""),
        url.port().map(|p| format!(":{}", p)).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_creation() {
        let req = Request::get("https://example.com/path").unwrap();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url.host_str(), Some("example.com"));
        assert!(!req.csrf_exempt);
        assert!(!req.is_public);
    }

    #[test]
    fn test_request_headers() {
        let req = Request::get("https://example.com")
            .unwrap()
            .header("x-custom", "value");
        assert_eq!(req.header_value("x-custom"), Some("value"));
    }

    #[test]
    fn test_request_origin() {
        let req = Request::get("https://example.com:8080/path").unwrap();
        assert_eq!(req.origin(), "https://example.com:8080");

        let req = Request::get("https://example.com:443/path").unwrap();
        assert_eq!(req.origin(), "https://example.com");
    }

    #[test]
    fn test_request_flags() {
        let req = Request::new(Method::DELETE, "http://example.com/item/1")
            .unwrap()
            .csrf_exempt(true)
            .public(true);
        assert!(req.csrf_exempt);
        assert!(req.is_public);
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let req = Request::post("http://example.com")
            .unwrap()
            .json(&serde_json::json!({ "next": "/a b" }))
            .unwrap();
        assert_eq!(req.header_value("content-type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(&br#"{"next":"/a b"}"#[..]));
    }
}
