// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Token and CSRF caches
//!
//! - [`AccessToken`] - decoded JWT cookie
//! - [`TokenCache`] - keeps the access token fresh, one refresh at a time
//! - [`CsrfTokenCache`] - per-origin CSRF tokens, one fetch per origin at a time

mod csrf;
mod token;
mod token_cache;

use async_trait::async_trait;

use crate::error::Result;

pub use csrf::{CsrfTokenCache, CSRF_PROTECTED_METHODS};
pub use token::{AccessToken, AuthenticatedUser, TokenClaims};
pub use token_cache::TokenCache;

#[cfg(test)]
pub(crate) use token::tests as token_fixtures;

/// Source of the current access token.
///
/// [`TokenCache`] is the production implementation; the session facade and
/// the auth-freshness step only see this trait, so either can be driven by
/// a stub.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A fresh token, `None` when there is no session
    async fn get(&self) -> Result<Option<AccessToken>>;

    /// Forget any cached token
    fn clear(&self) {}
}
