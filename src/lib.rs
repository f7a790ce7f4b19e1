// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Evaste - Cookie-Session Authentication for HTTP Clients
//!
//! Evaste wraps an HTTP transport with browser-style session handling: a
//! JWT kept in a cookie is refreshed before requests go out, CSRF tokens
//! are attached to state-changing requests, and users without a session
//! are sent to the login page without bouncing back and forth.
//!
//! ## Features
//!
//! - Single-flight token refresh: N concurrent callers, one network call
//! - Per-origin CSRF token cache with single-flight fetches
//! - Ordered interceptor pipeline (`csrf`, `auth-freshness`, `error-normalizer`)
//! - Login/logout redirects with a redirect-loop guard
//! - Pluggable transport, cookie store, logging sink and navigator
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use evaste::{AuthConfig, AuthenticatedClient, TracingLoggingService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new()
//!         .app_base_url("https://app.example.com")
//!         .auth_base_url("https://auth.example.com")
//!         .login_url("https://auth.example.com/login")
//!         .logout_url("https://auth.example.com/logout")
//!         .access_token_cookie_name("jwt-header-payload")
//!         .refresh_access_token_endpoint("/login_refresh")
//!         .csrf_token_api_path("/csrf/api/v1/token")
//!         .logging_service(Arc::new(TracingLoggingService));
//!
//!     let client = AuthenticatedClient::new(&config)?;
//!
//!     if let Some(session) = client.ensure_authenticated_user("/dashboard").await? {
//!         println!("Hello {}", session.authenticated_user.username);
//!         let response = client.post("https://api.example.com/v1/items", "{}").await?;
//!         println!("Status: {}", response.status);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod http;
pub mod logging;
pub mod network;
pub mod session;

// Re-exports for convenience

// Session
pub use session::{
    get_authenticated_api_client, reset_authenticated_api_client, AuthConfig, AuthSettings,
    AuthenticatedClient, AuthenticatedSession, Navigator, RecordingNavigator, Session,
    SessionConfig, SessionState,
};

// Tokens
pub use auth::{AccessToken, AccessTokenSource, AuthenticatedUser, CsrfTokenCache, TokenCache};

// Errors
pub use error::{Error, InterceptorError, Result};

// HTTP
pub use http::{Cookie, CookieJar, CookieStore, HttpClient, Request, Response, Transport};

// Logging
pub use logging::{LoggingService, MemoryLoggingService, TracingLoggingService};

// Network
pub use network::{InterceptorChain, RequestInterceptor, ResponseInterceptor};

/// Evaste version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
