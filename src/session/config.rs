// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session configuration
//!
//! [`AuthSettings`] holds the plain URL/string settings and can be loaded
//! from JSON. [`AuthConfig`] adds the collaborators that cannot be
//! serialized (logging service, navigator, hooks) and is validated into a
//! [`SessionConfig`] before anything is built from it.

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use url::Url;

use super::navigator::{Navigator, RecordingNavigator};
use crate::error::{Error, InterceptorError, Result};
use crate::http::{HttpClientConfig, Request};
use crate::logging::LoggingService;

/// Largest accepted clock skew (one day)
pub const MAX_CLOCK_SKEW_SECS: i64 = 86_400;

/// Called when the refresh endpoint itself fails
pub type RefreshFailureHandler = Arc<dyn Fn(&InterceptorError) + Send + Sync>;

/// Called when a non-public request finds no session
pub type EmptyTokenHandler = Arc<dyn Fn(&Request) + Send + Sync>;

/// Serializable session settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    pub app_base_url: Option<String>,
    pub auth_base_url: Option<String>,
    pub login_url: Option<String>,
    pub logout_url: Option<String>,
    pub access_token_cookie_name: Option<String>,
    /// Absolute, or relative to `auth_base_url`
    pub refresh_access_token_endpoint: Option<String>,
    pub csrf_token_api_path: Option<String>,
    /// Seconds before `exp` at which a token already counts as expired
    pub clock_skew_secs: Option<i64>,
}

impl AuthSettings {
    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Builder for the authenticated client configuration
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub settings: AuthSettings,
    pub logging_service: Option<Arc<dyn LoggingService>>,
    pub navigator: Option<Arc<dyn Navigator>>,
    pub handle_refresh_access_token_failure: Option<RefreshFailureHandler>,
    pub handle_empty_access_token: Option<EmptyTokenHandler>,
    pub clock_skew: Option<Duration>,
    pub http: HttpClientConfig,
}

impl AuthConfig {
    /// Create an empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from loaded settings
    pub fn from_settings(settings: AuthSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn app_base_url(mut self, url: impl Into<String>) -> Self {
        self.settings.app_base_url = Some(url.into());
        self
    }

    pub fn auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.settings.auth_base_url = Some(url.into());
        self
    }

    pub fn login_url(mut self, url: impl Into<String>) -> Self {
        self.settings.login_url = Some(url.into());
        self
    }

    pub fn logout_url(mut self, url: impl Into<String>) -> Self {
        self.settings.logout_url = Some(url.into());
        self
    }

    pub fn access_token_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.access_token_cookie_name = Some(name.into());
        self
    }

    pub fn refresh_access_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.settings.refresh_access_token_endpoint = Some(endpoint.into());
        self
    }

    pub fn csrf_token_api_path(mut self, path: impl Into<String>) -> Self {
        self.settings.csrf_token_api_path = Some(path.into());
        self
    }

    /// Set the logging service (required)
    pub fn logging_service(mut self, service: Arc<dyn LoggingService>) -> Self {
        self.logging_service = Some(service);
        self
    }

    /// Set the navigator used for login/logout redirects
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn handle_refresh_access_token_failure<F>(mut self, handler: F) -> Self
    where
        F: Fn(&InterceptorError) + Send + Sync + 'static,
    {
        self.handle_refresh_access_token_failure = Some(Arc::new(handler));
        self
    }

    pub fn handle_empty_access_token<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request) + Send + Sync + 'static,
    {
        self.handle_empty_access_token = Some(Arc::new(handler));
        self
    }

    /// Refresh tokens this long before they expire
    pub fn clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = Some(skew);
        self
    }

    /// Transport settings for the default `HttpClient`
    pub fn http_config(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    /// Check every required key and resolve URLs.
    pub fn validate(&self) -> Result<SessionConfig> {
        let s = &self.settings;

        let app_base_url = required(&s.app_base_url, "appBaseUrl")?;
        let auth_base_url = required(&s.auth_base_url, "authBaseUrl")?;
        let login_url = required(&s.login_url, "loginUrl")?;
        let logout_url = required(&s.logout_url, "logoutUrl")?;
        let access_token_cookie_name =
            required(&s.access_token_cookie_name, "accessTokenCookieName")?;
        let refresh_endpoint =
            required(&s.refresh_access_token_endpoint, "refreshAccessTokenEndpoint")?;
        let csrf_token_api_path = required(&s.csrf_token_api_path, "csrfTokenApiPath")?;
        let logging_service = self
            .logging_service
            .clone()
            .ok_or_else(|| Error::missing_key("loggingService"))?;

        parse_url(app_base_url, "appBaseUrl")?;
        parse_url(login_url, "loginUrl")?;
        parse_url(logout_url, "logoutUrl")?;
        let auth_base_url = parse_url(auth_base_url, "authBaseUrl")?;
        let refresh_access_token_endpoint = auth_base_url.join(refresh_endpoint).map_err(|e| {
            Error::Config(format!("invalid URL for refreshAccessTokenEndpoint: {}", e))
        })?;

        let clock_skew = match (self.clock_skew, s.clock_skew_secs) {
            (Some(skew), _) => skew,
            (None, Some(secs)) => Duration::try_seconds(secs)
                .ok_or_else(|| Error::Config(format!("clockSkewSecs out of range: {}", secs)))?,
            (None, None) => Duration::zero(),
        };
        if clock_skew < Duration::zero() {
            return Err(Error::Config("clock skew must not be negative".into()));
        }
        if clock_skew > Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            return Err(Error::Config(format!(
                "clock skew must not exceed {} seconds",
                MAX_CLOCK_SKEW_SECS
            )));
        }

        Ok(SessionConfig {
            app_base_url: app_base_url.to_string(),
            auth_base_url,
            login_url: login_url.to_string(),
            logout_url: logout_url.to_string(),
            access_token_cookie_name: access_token_cookie_name.to_string(),
            refresh_access_token_endpoint,
            csrf_token_api_path: csrf_token_api_path.to_string(),
            logging_service,
            navigator: self
                .navigator
                .clone()
                .unwrap_or_else(|| Arc::new(RecordingNavigator::new())),
            handle_refresh_access_token_failure: self.handle_refresh_access_token_failure.clone(),
            handle_empty_access_token: self.handle_empty_access_token.clone(),
            clock_skew,
            http: self.http.clone(),
        })
    }
}

/// Validated configuration
#[derive(Clone)]
pub struct SessionConfig {
    pub app_base_url: String,
    pub auth_base_url: Url,
    pub login_url: String,
    pub logout_url: String,
    pub access_token_cookie_name: String,
    pub refresh_access_token_endpoint: Url,
    pub csrf_token_api_path: String,
    pub logging_service: Arc<dyn LoggingService>,
    pub navigator: Arc<dyn Navigator>,
    pub handle_refresh_access_token_failure: Option<RefreshFailureHandler>,
    pub handle_empty_access_token: Option<EmptyTokenHandler>,
    pub clock_skew: Duration,
    pub http: HttpClientConfig,
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::missing_key(key)),
    }
}

fn parse_url(value: &str, key: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| Error::Config(format!("invalid URL for {}: {}", key, e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logging::MemoryLoggingService;
    use std::io::Write;

    pub(crate) fn complete_config() -> AuthConfig {
        AuthConfig::new()
            .app_base_url("http://app.example.com")
            .auth_base_url("http://auth.example.com")
            .login_url("http://auth.example.com/login")
            .logout_url("http://auth.example.com/logout")
            .access_token_cookie_name("edx-jwt-cookie-header-payload")
            .refresh_access_token_endpoint("/login_refresh")
            .csrf_token_api_path("/csrf/api/v1/token")
            .logging_service(Arc::new(MemoryLoggingService::new()))
    }

    #[test]
    fn test_complete_config_validates() {
        let config = complete_config().validate().unwrap();
        assert_eq!(
            config.refresh_access_token_endpoint.as_str(),
            "http://auth.example.com/login_refresh"
        );
        assert_eq!(config.clock_skew, Duration::zero());
    }

    #[test]
    fn test_missing_keys_are_named() {
        let mut config = complete_config();
        config.settings.login_url = None;
        assert_eq!(
            config.validate().err().unwrap().to_string(),
            "Configuration error: missing required configuration key: loginUrl"
        );

        let mut config = complete_config();
        config.settings.csrf_token_api_path = Some("  ".into());
        assert!(config
            .validate()
            .err()
            .unwrap()
            .to_string()
            .ends_with("csrfTokenApiPath"));

        let mut config = complete_config();
        config.logging_service = None;
        assert!(config
            .validate()
            .err()
            .unwrap()
            .to_string()
            .ends_with("loggingService"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = complete_config().login_url("not a url");
        let err = config.validate().err().unwrap();
        assert!(matches!(err, Error::Config(msg) if msg.contains("loginUrl")));
    }

    #[test]
    fn test_absolute_refresh_endpoint_is_kept() {
        let config = complete_config()
            .refresh_access_token_endpoint("https://lms.example.com/login_refresh")
            .validate()
            .unwrap();
        assert_eq!(
            config.refresh_access_token_endpoint.as_str(),
            "https://lms.example.com/login_refresh"
        );
    }

    #[test]
    fn test_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "appBaseUrl": "http://app.example.com",
                "authBaseUrl": "http://auth.example.com",
                "loginUrl": "http://auth.example.com/login",
                "logoutUrl": "http://auth.example.com/logout",
                "accessTokenCookieName": "jwt",
                "refreshAccessTokenEndpoint": "/login_refresh",
                "csrfTokenApiPath": "/csrf/api/v1/token",
                "clockSkewSecs": 30
            }}"#
        )
        .unwrap();

        let settings = AuthSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.access_token_cookie_name.as_deref(), Some("jwt"));

        let config = AuthConfig::from_settings(settings)
            .logging_service(Arc::new(MemoryLoggingService::new()))
            .validate()
            .unwrap();
        assert_eq!(config.clock_skew, Duration::seconds(30));
    }

    #[test]
    fn test_out_of_range_clock_skew_is_a_config_error() {
        for secs in [i64::MAX, i64::MIN, MAX_CLOCK_SKEW_SECS + 1, -1] {
            let settings = AuthSettings::from_json(&format!(r#"{{"clockSkewSecs": {}}}"#, secs))
                .unwrap();
            let mut config = complete_config();
            config.settings.clock_skew_secs = settings.clock_skew_secs;

            let err = config.validate().err().unwrap();
            assert!(matches!(err, Error::Config(_)), "{} gave {}", secs, err);
        }

        let config = complete_config().clock_skew(Duration::days(365));
        assert!(matches!(config.validate().err().unwrap(), Error::Config(_)));
    }

    #[test]
    fn test_builder_clock_skew_wins_over_settings() {
        let mut config = complete_config().clock_skew(Duration::seconds(5));
        config.settings.clock_skew_secs = Some(60);
        assert_eq!(config.validate().unwrap().clock_skew, Duration::seconds(5));
    }
}
