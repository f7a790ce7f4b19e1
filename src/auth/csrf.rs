// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Per-origin CSRF token cache
//!
//! Tokens are fetched lazily from `{origin}{csrf_token_api_path}` the first
//! time a state-changing request goes to that origin, and reused until the
//! store is reset. Concurrent requests to one origin share a single fetch.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::Method;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::http::{Request, Transport};

/// Methods that require a CSRF token
pub const CSRF_PROTECTED_METHODS: [Method; 4] =
    [Method::POST, Method::PUT, Method::PATCH, Method::DELETE];

type PendingFetch = Shared<BoxFuture<'static, Result<String>>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenResponse {
    csrf_token: String,
}

struct Inner {
    transport: Arc<dyn Transport>,
    api_path: String,
    tokens: DashMap<String, String>,
    pending: Mutex<HashMap<String, PendingFetch>>,
}

/// CSRF token cache keyed by origin
#[derive(Clone)]
pub struct CsrfTokenCache {
    inner: Arc<Inner>,
}

impl CsrfTokenCache {
    /// Create a cache fetching tokens from `api_path` on each origin
    pub fn new(transport: Arc<dyn Transport>, api_path: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                api_path: api_path.into(),
                tokens: DashMap::new(),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// True when the request does not need a token: the method is not
    /// state-changing, or the caller opted out explicitly.
    pub fn is_exempt(method: &Method, explicit_exempt: bool) -> bool {
        explicit_exempt || !CSRF_PROTECTED_METHODS.contains(method)
    }

    /// Token for `origin`, fetching it once if not cached
    pub async fn get_token(&self, origin: &str) -> Result<String> {
        if let Some(token) = self.inner.tokens.get(origin) {
            tracing::debug!(origin, "CSRF token served from cache");
            return Ok(token.value().clone());
        }

        let fetch = {
            let mut pending = self.inner.pending.lock();

            // A fetch may have settled between the lookup above and the lock
            if let Some(token) = self.inner.tokens.get(origin) {
                return Ok(token.value().clone());
            }

            match pending.get(origin) {
                Some(fetch) => fetch.clone(),
                None => {
                    let fetch = Inner::fetch(self.inner.clone(), origin.to_string())
                        .boxed()
                        .shared();
                    pending.insert(origin.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Pre-populate or overwrite the token for an origin
    pub fn set_token(&self, origin: impl Into<String>, token: impl Into<String>) {
        self.inner.tokens.insert(origin.into(), token.into());
    }

    /// Cached token for an origin, without fetching
    pub fn cached_token(&self, origin: &str) -> Option<String> {
        self.inner.tokens.get(origin).map(|t| t.value().clone())
    }

    /// Drop the token for one origin
    pub fn clear_token(&self, origin: &str) {
        self.inner.tokens.remove(origin);
    }

    /// Drop every cached token
    pub fn clear(&self) {
        self.inner.tokens.clear();
    }

    /// Number of fetches currently in flight
    pub fn pending_fetches(&self) -> usize {
        self.inner.pending.lock().len()
    }
}

impl Inner {
    async fn fetch(self: Arc<Self>, origin: String) -> Result<String> {
        let result = self
            .request_token(&origin)
            .await
            .map_err(|e| Error::csrf_fetch(origin.clone(), e));

        let mut pending = self.pending.lock();
        if let Ok(token) = &result {
            self.tokens.insert(origin.clone(), token.clone());
        }
        pending.remove(&origin);

        result
    }

    async fn request_token(&self, origin: &str) -> Result<String> {
        let url = format!("{}{}", origin, self.api_path);
        tracing::info!(url = %url, "Fetching CSRF token");

        let request = Request::get(&url)?.csrf_exempt(true).public(true);
        let response = self.transport.execute(request).await?.error_for_status(&url)?;
        let body: CsrfTokenResponse = response.json()?;
        Ok(body.csrf_token)
    }
}
