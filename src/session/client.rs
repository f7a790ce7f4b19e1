// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Authenticated API client
//!
//! Wraps a [`Transport`] with the session pipeline: every request gets a
//! CSRF token when it needs one and a fresh access token cookie, and every
//! failure comes back as a normalized, logged error.

use std::sync::Arc;

use bytes::Bytes;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use super::config::{AuthConfig, SessionConfig};
use super::facade::{AuthenticatedSession, Session, SessionState};
use crate::auth::{AccessTokenSource, AuthenticatedUser, CsrfTokenCache, TokenCache};
use crate::error::Result;
use crate::http::{headers, CookieJar, CookieStore, HttpClient, Request, Response, Transport};
use crate::network::{AuthFreshnessStep, CsrfStep, ErrorNormalizer, InterceptorChain};

lazy_static! {
    static ref API_CLIENT: RwLock<Option<Arc<AuthenticatedClient>>> = RwLock::new(None);
}

/// HTTP client that carries the user's session
pub struct AuthenticatedClient {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    cookies: Arc<dyn CookieStore>,
    tokens: TokenCache,
    csrf: CsrfTokenCache,
    chain: InterceptorChain,
    session: Session,
    default_headers: HeaderMap,
}

impl AuthenticatedClient {
    /// Build a client on a fresh reqwest transport and cookie jar
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let config = config.validate()?;
        let jar = CookieJar::new();
        let transport = HttpClient::with_cookie_jar(config.http.clone(), jar.clone())?;
        Ok(Self::build(config, Arc::new(transport), Arc::new(jar)))
    }

    /// Build a client on a caller-supplied transport and cookie store
    pub fn with_transport(
        config: &AuthConfig,
        transport: Arc<dyn Transport>,
        cookies: Arc<dyn CookieStore>,
    ) -> Result<Self> {
        Ok(Self::build(config.validate()?, transport, cookies))
    }

    fn build(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        cookies: Arc<dyn CookieStore>,
    ) -> Self {
        let normalizer = Arc::new(
            ErrorNormalizer::new(
                config.logging_service.clone(),
                config.refresh_access_token_endpoint.clone(),
            )
            .on_refresh_failure(config.handle_refresh_access_token_failure.clone()),
        );

        let tokens = TokenCache::new(
            transport.clone(),
            cookies.clone(),
            config.access_token_cookie_name.clone(),
            config.refresh_access_token_endpoint.clone(),
        )
        .with_clock_skew(config.clock_skew)
        .with_error_step(normalizer.clone());

        let csrf = CsrfTokenCache::new(transport.clone(), config.csrf_token_api_path.clone());
        let token_source: Arc<dyn AccessTokenSource> = Arc::new(tokens.clone());

        let mut chain = InterceptorChain::new();
        chain
            .add_request_step(CsrfStep::new(csrf.clone()))
            .add_request_step(
                AuthFreshnessStep::new(token_source.clone())
                    .on_empty_token(config.handle_empty_access_token.clone()),
            )
            .add_response_step(normalizer);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            HeaderName::from_static(headers::USE_JWT_COOKIE),
            HeaderValue::from_static("true"),
        );

        let session = Session::new(token_source, &config);

        tracing::debug!(
            app = %config.app_base_url,
            refresh = %config.refresh_access_token_endpoint,
            "Authenticated client configured"
        );

        Self {
            config,
            transport,
            cookies,
            tokens,
            csrf,
            chain,
            session,
            default_headers,
        }
    }

    /// Send a request through the session pipeline.
    ///
    /// Request-step failures come back unchanged and the request is not
    /// sent. Transport failures and non-2xx responses come back normalized.
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        for (name, value) in self.default_headers.iter() {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }

        self.chain.process_request(&mut request).await?;

        let url = request.url_str().to_string();
        let result = match self.transport.execute(request).await {
            Ok(response) => response.error_for_status(&url),
            Err(e) => Err(e),
        };
        self.chain.process_response(&url, result).await
    }

    pub async fn get(&self, url: impl AsRef<str>) -> Result<Response> {
        self.execute(Request::get(url)?).await
    }

    pub async fn post(&self, url: impl AsRef<str>, body: impl Into<Bytes>) -> Result<Response> {
        self.execute(Request::post(url)?.body(body)).await
    }

    /// POST a JSON body
    pub async fn post_json<T: Serialize>(&self, url: impl AsRef<str>, data: &T) -> Result<Response> {
        self.execute(Request::post(url)?.json(data)?).await
    }

    pub async fn put(&self, url: impl AsRef<str>, body: impl Into<Bytes>) -> Result<Response> {
        self.execute(Request::new(Method::PUT, url)?.body(body)).await
    }

    pub async fn patch(&self, url: impl AsRef<str>, body: impl Into<Bytes>) -> Result<Response> {
        self.execute(Request::new(Method::PATCH, url)?.body(body)).await
    }

    pub async fn delete(&self, url: impl AsRef<str>) -> Result<Response> {
        self.execute(Request::new(Method::DELETE, url)?).await
    }

    /// See [`Session::ensure_authenticated_user`]
    pub async fn ensure_authenticated_user(
        &self,
        route: &str,
    ) -> Result<Option<AuthenticatedSession>> {
        self.session.ensure_authenticated_user(route).await
    }

    /// Redirect to login; returns the target URL
    pub fn login(&self, redirect_url: Option<&str>) -> String {
        self.session.login(redirect_url)
    }

    /// Redirect to logout; returns the target URL
    pub fn logout(&self, redirect_url: Option<&str>) -> String {
        self.session.logout(redirect_url)
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn authenticated_user(&self) -> Option<AuthenticatedUser> {
        self.session.authenticated_user()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    pub fn csrf_tokens(&self) -> &CsrfTokenCache {
        &self.csrf
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.chain
    }

    pub fn cookies(&self) -> &Arc<dyn CookieStore> {
        &self.cookies
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// Process-wide client. The first successful call configures it; later
/// calls return the same instance whatever config they pass.
pub fn get_authenticated_api_client(config: &AuthConfig) -> Result<Arc<AuthenticatedClient>> {
    if let Some(client) = API_CLIENT.read().as_ref() {
        return Ok(client.clone());
    }

    let mut slot = API_CLIENT.write();
    if let Some(client) = slot.as_ref() {
        return Ok(client.clone());
    }

    let client = Arc::new(AuthenticatedClient::new(config)?);
    *slot = Some(client.clone());
    tracing::info!(app = %client.config().app_base_url, "Authenticated API client configured");
    Ok(client)
}

/// Drop the process-wide client so the next call configures a new one
pub fn reset_authenticated_api_client() {
    API_CLIENT.write().take();
}
