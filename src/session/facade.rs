// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session facade: ensure a user is logged in, or send them to log in

use std::sync::Arc;

use parking_lot::RwLock;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use super::config::SessionConfig;
use super::navigator::Navigator;
use crate::auth::{AccessToken, AccessTokenSource, AuthenticatedUser};
use crate::error::{Error, Result};
use crate::logging::{LogAttributes, LoggingService};

/// What the facade last learned about the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing checked yet, or the last check failed
    #[default]
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// A logged-in user together with the token that proves it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub authenticated_user: AuthenticatedUser,
    pub access_token: AccessToken,
}

/// Login/logout redirects and the authenticated-user check
pub struct Session {
    tokens: Arc<dyn AccessTokenSource>,
    navigator: Arc<dyn Navigator>,
    logging: Arc<dyn LoggingService>,
    app_base_url: String,
    login_url: String,
    logout_url: String,
    state: RwLock<SessionState>,
    user: RwLock<Option<AuthenticatedUser>>,
}

impl Session {
    pub fn new(tokens: Arc<dyn AccessTokenSource>, config: &SessionConfig) -> Self {
        Self {
            tokens,
            navigator: config.navigator.clone(),
            logging: config.logging_service.clone(),
            app_base_url: config.app_base_url.clone(),
            login_url: config.login_url.clone(),
            logout_url: config.logout_url.clone(),
            state: RwLock::new(SessionState::Unknown),
            user: RwLock::new(None),
        }
    }

    /// Resolve the current user, redirecting to login when there is none.
    ///
    /// - `Ok(Some(_))`: logged in
    /// - `Ok(None)`: a login redirect was issued; do not render
    /// - `Err(RedirectLoop)`: no session although we just came from login
    /// - `Err(_)`: the token could not be obtained; logout was triggered
    pub async fn ensure_authenticated_user(
        &self,
        route: &str,
    ) -> Result<Option<AuthenticatedSession>> {
        match self.tokens.get().await {
            Ok(Some(access_token)) => {
                let authenticated_user = access_token.authenticated_user();
                *self.user.write() = Some(authenticated_user.clone());
                *self.state.write() = SessionState::Authenticated;
                Ok(Some(AuthenticatedSession {
                    authenticated_user,
                    access_token,
                }))
            }
            Ok(None) => {
                *self.user.write() = None;
                *self.state.write() = SessionState::Unauthenticated;

                if self.is_redirect_from_login_page() {
                    tracing::warn!(login_url = %self.login_url, "No session after login redirect");
                    return Err(Error::RedirectLoop);
                }

                self.login(Some(&format!("{}{}", self.app_base_url, route)));
                Ok(None)
            }
            Err(e) => {
                *self.user.write() = None;
                *self.state.write() = SessionState::Unknown;

                let mut attributes = LogAttributes::new();
                attributes.insert("route".into(), Value::from(route));
                if let Some(status) = e.status_code() {
                    attributes.insert("httpErrorStatus".into(), Value::from(status));
                }
                self.logging
                    .log_error(&format!("Unable to get access token: {}", e), &attributes);

                self.logout(None);
                Err(e)
            }
        }
    }

    /// Redirect to the login page; returns the target
    pub fn login(&self, redirect_url: Option<&str>) -> String {
        let next = redirect_url.unwrap_or(&self.app_base_url);
        let target = format!("{}?next={}", self.login_url, urlencode(next));
        self.logging.log_info(&format!("Redirecting to login: {}", target));
        self.navigator.redirect(&target);
        target
    }

    /// Forget the token and redirect to the logout page; returns the target
    pub fn logout(&self, redirect_url: Option<&str>) -> String {
        self.tokens.clear();
        *self.user.write() = None;

        let back = redirect_url.unwrap_or(&self.app_base_url);
        let target = format!("{}?redirect_url={}", self.logout_url, urlencode(back));
        self.logging.log_info(&format!("Redirecting to logout: {}", target));
        self.navigator.redirect(&target);
        target
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// The user from the last successful check, without network access
    pub fn authenticated_user(&self) -> Option<AuthenticatedUser> {
        self.user.read().clone()
    }

    fn is_redirect_from_login_page(&self) -> bool {
        match self.navigator.referrer() {
            Some(referrer) => !referrer.is_empty() && referrer.starts_with(&self.login_url),
            None => false,
        }
    }
}

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn urlencode(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_fixtures::token_expiring_in;
    use crate::error::REDIRECT_LOOP_MESSAGE;
    use crate::logging::MemoryLoggingService;
    use crate::session::config::tests::complete_config;
    use crate::session::RecordingNavigator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Outcome {
        Token,
        NoSession,
        Fail,
    }

    struct StubTokens {
        outcome: Outcome,
        clears: AtomicUsize,
    }

    #[async_trait]
    impl AccessTokenSource for StubTokens {
        async fn get(&self) -> Result<Option<AccessToken>> {
            match self.outcome {
                Outcome::Token => Ok(Some(AccessToken::decode(&token_expiring_in(300))?)),
                Outcome::NoSession => Ok(None),
                Outcome::Fail => Err(Error::refresh("network unreachable")),
            }
        }

        fn clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        session: Session,
        navigator: Arc<RecordingNavigator>,
        logger: Arc<MemoryLoggingService>,
        tokens: Arc<StubTokens>,
    }

    fn fixture(outcome: Outcome, referrer: &str) -> Fixture {
        let navigator = Arc::new(RecordingNavigator::with_referrer(referrer));
        let logger = Arc::new(MemoryLoggingService::new());
        let tokens = Arc::new(StubTokens {
            outcome,
            clears: AtomicUsize::new(0),
        });
        let config = complete_config()
            .navigator(navigator.clone())
            .logging_service(logger.clone())
            .validate()
            .unwrap();
        Fixture {
            session: Session::new(tokens.clone(), &config),
            navigator,
            logger,
            tokens,
        }
    }

    #[tokio::test]
    async fn test_redirect_loop_is_rejected() {
        let f = fixture(Outcome::NoSession, "http://auth.example.com/login");

        let err = f.session.ensure_authenticated_user("").await.unwrap_err();

        assert!(err.is_redirect_loop());
        assert_eq!(err.to_string(), REDIRECT_LOOP_MESSAGE);
        assert!(f.navigator.redirects().is_empty());
        assert_eq!(f.session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_page_with_query_is_still_a_loop() {
        let f = fixture(Outcome::NoSession, "http://auth.example.com/login?next=x");
        assert!(f
            .session
            .ensure_authenticated_user("/courses")
            .await
            .unwrap_err()
            .is_redirect_loop());
    }

    #[tokio::test]
    async fn test_no_session_redirects_to_login() {
        let f = fixture(Outcome::NoSession, "");

        let result = f.session.ensure_authenticated_user("").await.unwrap();

        assert!(result.is_none());
        assert_eq!(
            f.navigator.last_redirect().as_deref(),
            Some("http://auth.example.com/login?next=http%3A%2F%2Fapp.example.com")
        );
    }

    #[tokio::test]
    async fn test_no_session_keeps_route() {
        let f = fixture(Outcome::NoSession, "http://app.example.com/other");

        f.session
            .ensure_authenticated_user("/dashboard?tab=1")
            .await
            .unwrap();

        assert_eq!(
            f.navigator.last_redirect().as_deref(),
            Some("http://auth.example.com/login?next=http%3A%2F%2Fapp.example.com%2Fdashboard%3Ftab%3D1")
        );
    }

    #[tokio::test]
    async fn test_authenticated_user_resolves() {
        let f = fixture(Outcome::Token, "");

        let session = f
            .session
            .ensure_authenticated_user("/")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(session.authenticated_user.username, "honor");
        assert_eq!(session.authenticated_user.roles, vec!["staff".to_string()]);
        assert!(f.navigator.redirects().is_empty());
        assert_eq!(f.session.state(), SessionState::Authenticated);
        assert_eq!(
            f.session.authenticated_user(),
            Some(session.authenticated_user)
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_logs_out_and_rejects() {
        let f = fixture(Outcome::Fail, "");

        let err = f.session.ensure_authenticated_user("/").await.unwrap_err();

        assert!(matches!(err, Error::Refresh(ref msg) if msg == "network unreachable"));
        assert_eq!(
            f.navigator.last_redirect().as_deref(),
            Some("http://auth.example.com/logout?redirect_url=http%3A%2F%2Fapp.example.com")
        );
        assert_eq!(f.tokens.clears.load(Ordering::SeqCst), 1);
        assert_eq!(f.logger.errors().len(), 1);
        assert_eq!(f.session.state(), SessionState::Unknown);
    }

    #[test]
    fn test_login_and_logout_targets() {
        let f = fixture(Outcome::NoSession, "");

        assert_eq!(
            f.session.login(Some("http://app.example.com/a b")),
            "http://auth.example.com/login?next=http%3A%2F%2Fapp.example.com%2Fa%20b"
        );
        assert_eq!(
            f.session.logout(None),
            "http://auth.example.com/logout?redirect_url=http%3A%2F%2Fapp.example.com"
        );
        assert_eq!(f.navigator.redirects().len(), 2);
    }

    #[test]
    fn test_urlencode_matches_uri_component_rules() {
        assert_eq!(urlencode("a b+c"), "a%20b%2Bc");
        assert_eq!(urlencode("/p?q=1&r=#f"), "%2Fp%3Fq%3D1%26r%3D%23f");
        assert_eq!(urlencode("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(urlencode("ä"), "%C3%A4");
    }
}
