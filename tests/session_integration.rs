// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! End-to-end tests for the authenticated client against a mock server

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use evaste::http::HttpClientConfig;
use evaste::{
    AuthConfig, AuthenticatedClient, Cookie, CookieJar, Error, HttpClient, InterceptorError,
    MemoryLoggingService, RecordingNavigator, SessionState,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COOKIE: &str = "jwt-header-payload";

fn token_expiring_in(secs: i64) -> String {
    let claims = json!({
        "sub": "abc123",
        "user_id": 42,
        "preferred_username": "staff-user",
        "roles": ["staff"],
        "administrator": true,
        "exp": chrono::Utc::now().timestamp() + secs,
    });
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

fn config(server: &MockServer) -> AuthConfig {
    AuthConfig::new()
        .app_base_url("http://app.example.com")
        .auth_base_url(server.uri())
        .login_url(format!("{}/login", server.uri()))
        .logout_url(format!("{}/logout", server.uri()))
        .access_token_cookie_name(COOKIE)
        .refresh_access_token_endpoint("/login_refresh")
        .csrf_token_api_path("/csrf/api/v1/token")
        .logging_service(Arc::new(MemoryLoggingService::new()))
}

/// Client on a jar the test can seed
fn client_with_jar(config: &AuthConfig) -> (AuthenticatedClient, CookieJar) {
    let jar = CookieJar::new();
    let http = HttpClient::with_cookie_jar(HttpClientConfig::default(), jar.clone()).unwrap();
    let client =
        AuthenticatedClient::with_transport(config, Arc::new(http), Arc::new(jar.clone())).unwrap();
    (client, jar)
}

async fn mount_refresh(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/login_refresh"))
        .and(header("use-jwt-cookie", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "set-cookie",
                    format!("{}={}; Path=/", COOKIE, token_expiring_in(3600)).as_str(),
                )
                .set_delay(Duration::from_millis(100)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_csrf(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/csrf/api/v1/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "csrfToken": "csrf-token-1" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let server = MockServer::start().await;
    mount_refresh(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(10)
        .mount(&server)
        .await;

    let client = AuthenticatedClient::new(&config(&server)).unwrap();
    let url = format!("{}/api/v1/items", server.uri());

    let results = futures::future::join_all((0..10).map(|_| client.get(&url))).await;

    for result in results {
        assert_eq!(result.unwrap().status_code(), 200);
    }
    assert!(!client.tokens().is_refreshing());
    assert_eq!(
        client.tokens().peek().unwrap().claims().username,
        "staff-user"
    );
}

#[tokio::test]
async fn test_fresh_cookie_skips_refresh() {
    let server = MockServer::start().await;
    mount_refresh(&server, 0).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let (client, jar) = client_with_jar(&config(&server));
    jar.add(Cookie::new(COOKIE, token_expiring_in(600)));

    let url = format!("{}/api/v1/me", server.uri());
    client.get(&url).await.unwrap();
    client.get(&url).await.unwrap();
}

#[tokio::test]
async fn test_csrf_burst_fetches_once() {
    let server = MockServer::start().await;
    mount_refresh(&server, 1).await;
    mount_csrf(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/items"))
        .and(header("x-csrftoken", "csrf-token-1"))
        .and(header("use-jwt-cookie", "true"))
        .respond_with(ResponseTemplate::new(201))
        .expect(5)
        .mount(&server)
        .await;

    let client = AuthenticatedClient::new(&config(&server)).unwrap();
    let url = format!("{}/api/v1/items", server.uri());

    let results = futures::future::join_all((0..5).map(|i| {
        let (client, url) = (&client, &url);
        async move { client.post_json(url, &json!({ "n": i })).await }
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap().status_code(), 201);
    }
    assert_eq!(
        client.csrf_tokens().cached_token(&server.uri()).as_deref(),
        Some("csrf-token-1")
    );
}

#[tokio::test]
async fn test_safe_methods_never_fetch_csrf() {
    let server = MockServer::start().await;
    mount_csrf(&server, 0).await;

    Mock::given(path("/api/v1/items"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let (client, jar) = client_with_jar(&config(&server));
    jar.add(Cookie::new(COOKIE, token_expiring_in(600)));

    let url = format!("{}/api/v1/items", server.uri());
    client.get(&url).await.unwrap();
    client
        .execute(evaste::Request::post(&url).unwrap().csrf_exempt(true))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_prepopulated_csrf_token_is_used() {
    let server = MockServer::start().await;
    mount_csrf(&server, 0).await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/items/1"))
        .and(header("x-csrftoken", "preset"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, jar) = client_with_jar(&config(&server));
    jar.add(Cookie::new(COOKIE, token_expiring_in(600)));
    client.csrf_tokens().set_token(server.uri(), "preset");

    let response = client
        .put(format!("{}/api/v1/items/1", server.uri()), "{}")
        .await
        .unwrap();
    assert_eq!(response.status_code(), 204);
}

#[tokio::test]
async fn test_redirect_loop_guard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login_refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::with_referrer(format!(
        "{}/login",
        server.uri()
    )));
    let client =
        AuthenticatedClient::new(&config(&server).navigator(navigator.clone())).unwrap();

    let err = client.ensure_authenticated_user("").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Redirect from login page. Rejecting to avoid infinite redirect loop."
    );
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_no_session_redirects_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login_refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::with_referrer(""));
    let client =
        AuthenticatedClient::new(&config(&server).navigator(navigator.clone())).unwrap();

    let result = client.ensure_authenticated_user("").await.unwrap();

    assert!(result.is_none());
    assert_eq!(
        navigator.last_redirect().unwrap(),
        format!("{}/login?next=http%3A%2F%2Fapp.example.com", server.uri())
    );
    assert_eq!(client.session_state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_authenticated_user_is_resolved() {
    let server = MockServer::start().await;
    mount_refresh(&server, 1).await;

    let navigator = Arc::new(RecordingNavigator::new());
    let client =
        AuthenticatedClient::new(&config(&server).navigator(navigator.clone())).unwrap();

    let session = client.ensure_authenticated_user("/").await.unwrap().unwrap();

    assert_eq!(session.authenticated_user.user_id, "42");
    assert_eq!(session.authenticated_user.username, "staff-user");
    assert!(session.authenticated_user.administrator);
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_refresh_failure_logs_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login_refresh"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let hook_calls = Arc::new(AtomicUsize::new(0));
    let counter = hook_calls.clone();
    let logger = Arc::new(MemoryLoggingService::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let config = config(&server)
        .navigator(navigator.clone())
        .logging_service(logger.clone())
        .handle_refresh_access_token_failure(move |_: &InterceptorError| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let client = AuthenticatedClient::new(&config).unwrap();

    let err = client.ensure_authenticated_user("/").await.unwrap_err();

    assert!(matches!(err, Error::SessionRefreshFailed(_)));
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        navigator.last_redirect().unwrap(),
        format!(
            "{}/logout?redirect_url=http%3A%2F%2Fapp.example.com",
            server.uri()
        )
    );
    // one entry from the error step, one from the facade
    assert_eq!(logger.errors().len(), 2);
}

#[tokio::test]
async fn test_api_error_is_normalized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, jar) = client_with_jar(&config(&server));
    jar.add(Cookie::new(COOKIE, token_expiring_in(600)));

    let url = format!("{}/api/v1/missing", server.uri());
    let err = client.get(&url).await.unwrap_err();

    let normalized = err.interceptor_error().unwrap();
    assert_eq!(normalized.http_status, Some(404));
    assert_eq!(normalized.response_body.as_deref(), Some("not found"));
    assert_eq!(normalized.request_url, url);
    assert!(!err.is_session_refresh_failure());
}
