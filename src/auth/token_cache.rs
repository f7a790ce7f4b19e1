// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Access token cache with single-flight refresh
//!
//! The token lives in a cookie that the refresh endpoint rewrites. The
//! cache keeps the last decoded token in memory and, when it goes stale,
//! issues exactly one refresh for however many callers are waiting.
//!
//! # Concurrency
//!
//! The "is a refresh pending" check and the registration of a new pending
//! refresh happen under one `parking_lot` lock with no `.await` in
//! between. Waiters share a `futures::future::Shared` future, so every
//! one of them sees the same token or the same error.
//!
//! [`TokenCache::clear`] bumps a generation counter. A refresh started
//! before the bump still answers its own waiters but never writes its
//! token back into the cache.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::StatusCode;
use url::Url;

use super::token::AccessToken;
use super::AccessTokenSource;
use crate::error::{Error, Result};
use crate::http::{headers, CookieStore, Request, Transport};
use crate::network::ResponseInterceptor;

type PendingRefresh = Shared<BoxFuture<'static, Result<Option<AccessToken>>>>;

/// Cache state: the last good token and the refresh in flight, if any
#[derive(Default)]
struct TokenCacheState {
    cached: Option<AccessToken>,
    pending: Option<PendingRefresh>,
    generation: u64,
}

struct Inner {
    transport: Arc<dyn Transport>,
    cookies: Arc<dyn CookieStore>,
    cookie_name: String,
    refresh_endpoint: Url,
    clock_skew: Duration,
    error_step: Option<Arc<dyn ResponseInterceptor>>,
    state: Mutex<TokenCacheState>,
}

/// Access token cache
#[derive(Clone)]
pub struct TokenCache {
    inner: Arc<Inner>,
}

impl TokenCache {
    /// Create a cache reading `cookie_name` and refreshing via `refresh_endpoint`
    pub fn new(
        transport: Arc<dyn Transport>,
        cookies: Arc<dyn CookieStore>,
        cookie_name: impl Into<String>,
        refresh_endpoint: Url,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                cookies,
                cookie_name: cookie_name.into(),
                refresh_endpoint,
                clock_skew: Duration::zero(),
                error_step: None,
                state: Mutex::new(TokenCacheState::default()),
            }),
        }
    }

    /// Treat tokens as expired this much before their `exp`
    pub fn with_clock_skew(self, clock_skew: Duration) -> Self {
        self.rebuild(|inner| inner.clock_skew = clock_skew)
    }

    /// Route refresh failures through the response error step
    pub fn with_error_step(self, step: Arc<dyn ResponseInterceptor>) -> Self {
        self.rebuild(|inner| inner.error_step = Some(step))
    }

    fn rebuild(self, f: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = Inner {
            transport: self.inner.transport.clone(),
            cookies: self.inner.cookies.clone(),
            cookie_name: self.inner.cookie_name.clone(),
            refresh_endpoint: self.inner.refresh_endpoint.clone(),
            clock_skew: self.inner.clock_skew,
            error_step: self.inner.error_step.clone(),
            state: Mutex::new(TokenCacheState::default()),
        };
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Return a fresh token, refreshing it if needed.
    ///
    /// `Ok(None)` means the server reported no session.
    pub async fn get(&self) -> Result<Option<AccessToken>> {
        let pending = {
            let mut state = self.inner.state.lock();

            if let Some(token) = state.cached.clone() {
                if !token.is_expired(self.inner.clock_skew) {
                    tracing::debug!("Access token served from cache");
                    return Ok(Some(token));
                }
                state.cached = None;
            }

            if let Some(pending) = state.pending.clone() {
                tracing::debug!("Joining pending access token refresh");
                pending
            } else {
                if let Some(token) = self.inner.read_cookie() {
                    if !token.is_expired(self.inner.clock_skew) {
                        state.cached = Some(token.clone());
                        return Ok(Some(token));
                    }
                }

                let refresh = Inner::refresh(self.inner.clone(), state.generation)
                    .boxed()
                    .shared();
                state.pending = Some(refresh.clone());
                refresh
            }
        };

        pending.await
    }

    /// Cached token without touching the network or the cookie
    pub fn peek(&self) -> Option<AccessToken> {
        self.inner.state.lock().cached.clone()
    }

    /// Whether a refresh is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    /// Forget the cached token and detach any refresh in flight
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.generation = state.generation.wrapping_add(1);
        state.cached = None;
        state.pending = None;
    }

    pub fn refresh_endpoint(&self) -> &Url {
        &self.inner.refresh_endpoint
    }
}

impl Inner {
    /// Decode the token cookie; an undecodable cookie counts as absent
    fn read_cookie(&self) -> Option<AccessToken> {
        let raw = self.cookies.get(&self.cookie_name)?;
        match AccessToken::decode(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(cookie = %self.cookie_name, error = %e, "Ignoring undecodable access token cookie");
                None
            }
        }
    }

    async fn refresh(self: Arc<Self>, generation: u64) -> Result<Option<AccessToken>> {
        let result = self.exchange().await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!("Session cleared during refresh, discarding result");
            return result;
        }
        state.pending = None;
        if let Ok(Some(token)) = &result {
            state.cached = Some(token.clone());
        }
        result
    }

    async fn exchange(&self) -> Result<Option<AccessToken>> {
        let request = Request::post(self.refresh_endpoint.as_str())?
            .header(headers::USE_JWT_COOKIE, "true")
            .csrf_exempt(true)
            .public(true);
        let url = request.url_str().to_string();

        tracing::info!(endpoint = %url, "Refreshing access token");

        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(e) => return Err(self.reject(&url, e).await),
        };

        if response.status == StatusCode::UNAUTHORIZED {
            tracing::info!(endpoint = %url, "Refresh endpoint reported no session");
            return Ok(None);
        }

        if let Err(e) = response.error_for_status(&url) {
            return Err(self.reject(&url, e).await);
        }

        let raw = self.cookies.get(&self.cookie_name).ok_or_else(|| {
            Error::refresh("access token is missing after a successful refresh")
        })?;
        AccessToken::decode(&raw).map(Some)
    }

    async fn reject(&self, url: &str, error: Error) -> Error {
        match &self.error_step {
            Some(step) => step.on_error(url, error).await,
            None => error,
        }
    }
}

#[async_trait]
impl AccessTokenSource for TokenCache {
    async fn get(&self) -> Result<Option<AccessToken>> {
        TokenCache::get(self).await
    }

    fn clear(&self) {
        TokenCache::clear(self)
    }
}
