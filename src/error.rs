// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for Evaste
//!
//! Every error is `Clone`: a single refresh or CSRF fetch is shared between
//! all concurrent callers, and each of them receives the identical error.
//! Non-clone sources are kept behind `Arc`.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias for Evaste operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message carried by [`Error::RedirectLoop`]
pub const REDIRECT_LOOP_MESSAGE: &str =
    "Redirect from login page. Rejecting to avoid infinite redirect loop.";

/// Main error type for Evaste
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    /// I/O error (config files)
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Configuration is missing a key or holds an invalid value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Access token could not be decoded
    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    /// Token refresh failed in a way that is not "no session"
    #[error("Access token refresh failed: {0}")]
    Refresh(String),

    /// The refresh endpoint itself answered with an error
    #[error("Session refresh failed: {0}")]
    SessionRefreshFailed(Box<InterceptorError>),

    /// CSRF token could not be fetched for an origin
    #[error("CSRF token fetch failed for {origin}: {source}")]
    CsrfFetch {
        origin: String,
        #[source]
        source: Box<Error>,
    },

    /// Non-2xx response from the server
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    /// Response error annotated by the error-normalization step
    #[error("{0}")]
    Intercepted(Box<InterceptorError>),

    /// Unauthenticated navigation that started on the login page
    #[error("{}", REDIRECT_LOOP_MESSAGE)]
    RedirectLoop,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Normalized error shape produced by the response step.
#[derive(Debug, Clone)]
pub struct InterceptorError {
    /// HTTP status of the failed response, if a response was received
    pub http_status: Option<u16>,
    /// Response body, if any
    pub response_body: Option<String>,
    /// URL of the request that failed
    pub request_url: String,
    /// The error as produced by the transport
    pub original_error: Box<Error>,
}

impl InterceptorError {
    /// Build from a transport or status error.
    pub fn from_error(request_url: impl Into<String>, error: Error) -> Self {
        let (http_status, response_body) = match &error {
            Error::HttpStatus { status, body, .. } => (Some(*status), Some(body.clone())),
            Error::Http(e) => (e.status().map(|s| s.as_u16()), None),
            _ => (None, None),
        };

        Self {
            http_status,
            response_body,
            request_url: request_url.into(),
            original_error: Box::new(error),
        }
    }

    /// Short one-line description used as the log message
    pub fn summary(&self) -> String {
        match self.http_status {
            Some(status) => format!("HTTP {} for {}", status, self.request_url),
            None => format!("{} for {}", self.original_error, self.request_url),
        }
    }
}

impl fmt::Display for InterceptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.http_status, &self.response_body) {
            (Some(status), Some(body)) if !body.is_empty() => {
                write!(f, "HTTP {} from {}: {}", status, self.request_url, body)
            }
            (Some(status), _) => write!(f, "HTTP {} from {}", status, self.request_url),
            (None, _) => write!(f, "{} ({})", self.original_error, self.request_url),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(Arc::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(Arc::new(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl Error {
    /// Create a configuration error for a missing key
    pub fn missing_key(key: &str) -> Self {
        Error::Config(format!("missing required configuration key: {}", key))
    }

    /// Create a refresh error
    pub fn refresh<S: Into<String>>(msg: S) -> Self {
        Error::Refresh(msg.into())
    }

    /// Create a CSRF fetch error
    pub fn csrf_fetch(origin: impl Into<String>, source: Error) -> Self {
        Error::CsrfFetch {
            origin: origin.into(),
            source: Box::new(source),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is the redirect-loop guard
    pub fn is_redirect_loop(&self) -> bool {
        matches!(self, Error::RedirectLoop)
    }

    /// Check if the refresh endpoint failed
    pub fn is_session_refresh_failure(&self) -> bool {
        matches!(self, Error::SessionRefreshFailed(_))
    }

    /// Check if this is a CSRF fetch failure
    pub fn is_csrf_fetch(&self) -> bool {
        matches!(self, Error::CsrfFetch { .. })
    }

    /// The normalized error, if the response step produced one
    pub fn interceptor_error(&self) -> Option<&InterceptorError> {
        match self {
            Error::Intercepted(e) | Error::SessionRefreshFailed(e) => Some(e),
            _ => None,
        }
    }

    /// Get HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            Error::Intercepted(e) | Error::SessionRefreshFailed(e) => e.http_status,
            Error::CsrfFetch { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// Get the request URL if available
    pub fn request_url(&self) -> Option<&str> {
        match self {
            Error::HttpStatus { url, .. } => Some(url),
            Error::Intercepted(e) | Error::SessionRefreshFailed(e) => Some(&e.request_url),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
