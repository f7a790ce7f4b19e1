// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Access token decoding
//!
//! The JWT cookie is decoded, not verified: the server verifies the
//! signature on every request, the client only needs the claims to decide
//! whether a refresh is due and who the user is. The cookie may hold just
//! `header.payload` with the signature kept in a separate HttpOnly cookie.

use std::collections::BTreeSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Claims as they appear in the token payload
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<String>,
    user_id: Option<Value>,
    preferred_username: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    administrator: bool,
    exp: i64,
    email: Option<String>,
    name: Option<String>,
}

/// Decoded session claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenClaims {
    /// Stable subject identifier (`sub`, falling back to `user_id`)
    pub subject: String,
    /// Numeric or string user id when the issuer includes one
    pub user_id: Option<String>,
    pub username: String,
    pub roles: BTreeSet<String>,
    pub is_administrator: bool,
    pub expires_at: DateTime<Utc>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// A raw token together with its decoded claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    raw: String,
    claims: TokenClaims,
}

/// The user an access token was issued to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
    pub administrator: bool,
}

impl AccessToken {
    /// Decode a token from its cookie value
    pub fn decode(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let payload = raw
            .split('.')
            .nth(1)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::InvalidToken("expected header.payload[.signature]".into()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidToken(format!("payload is not base64url: {}", e)))?;
        let claims: RawClaims = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidToken(format!("payload is not valid claims: {}", e)))?;

        Ok(Self {
            raw: raw.to_string(),
            claims: claims.try_into()?,
        })
    }

    /// The token exactly as stored in the cookie
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Expired when `expires_at <= now + clock_skew`. A skew that
    /// overflows the calendar counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, clock_skew: Duration) -> bool {
        match now.checked_add_signed(clock_skew) {
            Some(limit) => self.claims.expires_at <= limit,
            None => true,
        }
    }

    pub fn is_expired(&self, clock_skew: Duration) -> bool {
        self.is_expired_at(Utc::now(), clock_skew)
    }

    /// The user described by this token
    pub fn authenticated_user(&self) -> AuthenticatedUser {
        let claims = &self.claims;
        AuthenticatedUser {
            user_id: claims
                .user_id
                .clone()
                .unwrap_or_else(|| claims.subject.clone()),
            username: claims.username.clone(),
            roles: claims.roles.iter().cloned().collect(),
            administrator: claims.is_administrator,
        }
    }
}

impl TryFrom<RawClaims> for TokenClaims {
    type Error = Error;

    fn try_from(raw: RawClaims) -> Result<Self> {
        let user_id = match raw.user_id {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(Error::InvalidToken(format!("unsupported user_id: {}", other)))
            }
        };

        let subject = raw
            .sub
            .or_else(|| user_id.clone())
            .ok_or_else(|| Error::InvalidToken("token has no subject".into()))?;

        let expires_at = Utc
            .timestamp_opt(raw.exp, 0)
            .single()
            .ok_or_else(|| Error::InvalidToken(format!("exp out of range: {}", raw.exp)))?;

        Ok(Self {
            subject,
            user_id,
            username: raw.preferred_username.unwrap_or_default(),
            roles: raw.roles.into_iter().collect(),
            is_administrator: raw.administrator,
            expires_at,
            email: raw.email,
            name: raw.name,
        })
    }
}
