// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP transport layer
//!
//! Provides the [`Transport`] seam the session layer is built on, a
//! reqwest-backed implementation with its own cookie jar, and the
//! request/response types that flow through the interceptor pipeline.

mod client;
mod cookie;
mod request;
mod response;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{HttpClient, HttpClientConfig};
pub use cookie::{Cookie, CookieJar, CookieStore};
pub use request::{origin_of, Request};
pub use response::Response;

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str = concat!("evaste/", env!("CARGO_PKG_VERSION"));

/// Something that can put a request on the wire.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status; `Err` means no response was received.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the response
    async fn execute(&self, request: Request) -> Result<Response>;
}

/// Common HTTP headers
pub mod headers {
    pub const ACCEPT: &str = "accept";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const COOKIE: &str = "cookie";
    pub const SET_COOKIE: &str = "set-cookie";
    /// `X-CSRFToken`, written by the CSRF step
    pub const X_CSRF_TOKEN: &str = "x-csrftoken";
    /// `USE-JWT-COOKIE`, asks the backend to authenticate from the JWT cookie
    pub const USE_JWT_COOKIE: &str = "use-jwt-cookie";
}
