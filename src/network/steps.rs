// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! The session pipeline steps
//!
//! Request side: [`CsrfStep`] then [`AuthFreshnessStep`]. Response side:
//! [`ErrorNormalizer`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use serde_json::Value;
use url::Url;

use super::interceptor_trait::{RequestInterceptor, ResponseInterceptor};
use crate::auth::{AccessTokenSource, CsrfTokenCache};
use crate::error::{Error, InterceptorError, Result};
use crate::http::{headers, Request};
use crate::logging::{LogAttributes, LoggingService};
use crate::session::{EmptyTokenHandler, RefreshFailureHandler};

/// Attaches `X-CSRFToken` to state-changing requests
pub struct CsrfStep {
    cache: CsrfTokenCache,
}

impl CsrfStep {
    pub fn new(cache: CsrfTokenCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl RequestInterceptor for CsrfStep {
    fn name(&self) -> &'static str {
        "csrf"
    }

    fn should_intercept(&self, request: &Request) -> bool {
        !CsrfTokenCache::is_exempt(&request.method, request.csrf_exempt)
    }

    async fn before_request(&self, request: &mut Request) -> Result<()> {
        let origin = request.origin();
        let token = self.cache.get_token(&origin).await?;
        let value = HeaderValue::from_str(&token).map_err(|_| {
            Error::csrf_fetch(origin, Error::other("token is not a valid header value"))
        })?;
        request.headers.insert(headers::X_CSRF_TOKEN, value);
        Ok(())
    }
}

/// Makes sure the access token cookie is fresh before the request goes out.
///
/// The token itself is not attached; the cookie travels with the request.
pub struct AuthFreshnessStep {
    tokens: Arc<dyn AccessTokenSource>,
    on_empty: Option<EmptyTokenHandler>,
}

impl AuthFreshnessStep {
    pub fn new(tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            tokens,
            on_empty: None,
        }
    }

    /// Call `handler` when a non-public request finds no session
    pub fn on_empty_token(mut self, handler: Option<EmptyTokenHandler>) -> Self {
        self.on_empty = handler;
        self
    }
}

#[async_trait]
impl RequestInterceptor for AuthFreshnessStep {
    fn name(&self) -> &'static str {
        "auth-freshness"
    }

    fn should_intercept(&self, request: &Request) -> bool {
        !request.is_public
    }

    async fn before_request(&self, request: &mut Request) -> Result<()> {
        if self.tokens.get().await?.is_none() {
            tracing::debug!(url = %request.url, "No access token for outgoing request");
            if let Some(handler) = &self.on_empty {
                handler(request);
            }
        }
        Ok(())
    }
}

/// Turns transport errors and non-2xx responses into [`InterceptorError`]s,
/// logs them, and flags failures of the refresh endpoint as fatal.
pub struct ErrorNormalizer {
    logging: Arc<dyn LoggingService>,
    refresh_endpoint: Url,
    on_refresh_failure: Option<RefreshFailureHandler>,
}

impl ErrorNormalizer {
    pub fn new(logging: Arc<dyn LoggingService>, refresh_endpoint: Url) -> Self {
        Self {
            logging,
            refresh_endpoint,
            on_refresh_failure: None,
        }
    }

    /// Call `handler` when the refresh endpoint itself fails
    pub fn on_refresh_failure(mut self, handler: Option<RefreshFailureHandler>) -> Self {
        self.on_refresh_failure = handler;
        self
    }

    /// Same scheme, host, port and path as the refresh endpoint
    pub fn is_refresh_endpoint(&self, request_url: &str) -> bool {
        match Url::parse(request_url) {
            Ok(url) => {
                url.scheme() == self.refresh_endpoint.scheme()
                    && url.host_str() == self.refresh_endpoint.host_str()
                    && url.port_or_known_default() == self.refresh_endpoint.port_or_known_default()
                    && url.path() == self.refresh_endpoint.path()
            }
            Err(_) => false,
        }
    }

    fn attributes(error: &InterceptorError) -> LogAttributes {
        let mut attrs = LogAttributes::new();
        let error_type = if error.http_status.is_some() {
            "api-response-error"
        } else {
            "api-request-error"
        };
        attrs.insert("httpErrorType".into(), Value::from(error_type));
        attrs.insert("httpErrorRequestUrl".into(), Value::from(error.request_url.clone()));
        if let Some(status) = error.http_status {
            attrs.insert("httpErrorStatus".into(), Value::from(status));
        }
        if let Some(body) = &error.response_body {
            attrs.insert("httpErrorResponseData".into(), Value::from(body.clone()));
        }
        attrs.insert(
            "httpErrorMessage".into(),
            Value::from(error.original_error.to_string()),
        );
        attrs
    }
}

#[async_trait]
impl ResponseInterceptor for ErrorNormalizer {
    fn name(&self) -> &'static str {
        "error-normalizer"
    }

    async fn on_error(&self, request_url: &str, error: Error) -> Error {
        if error.interceptor_error().is_some() {
            return error;
        }

        let normalized = InterceptorError::from_error(request_url, error);
        let attributes = Self::attributes(&normalized);

        if self.is_refresh_endpoint(request_url) {
            self.logging.log_error(
                &format!("Access token refresh failed: {}", normalized.summary()),
                &attributes,
            );
            if let Some(handler) = &self.on_refresh_failure {
                handler(&normalized);
            }
            return Error::SessionRefreshFailed(Box::new(normalized));
        }

        self.logging.log_error(&normalized.summary(), &attributes);
        Error::Intercepted(Box::new(normalized))
    }
}
