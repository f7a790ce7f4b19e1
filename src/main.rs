// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Evaste CLI - session-aware HTTP requests from the command line

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use evaste::{
    AuthConfig, AuthSettings, AuthenticatedClient, RecordingNavigator, Response,
    TracingLoggingService,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("evaste=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "whoami" => {
            let (client, navigator) = match build_client() {
                Ok(c) => c,
                Err(code) => return code,
            };
            whoami(&client, &navigator).await
        }
        "get" => {
            if args.len() < 3 {
                eprintln!("Usage: evaste get <url>");
                return ExitCode::from(1);
            }
            let (client, _) = match build_client() {
                Ok(c) => c,
                Err(code) => return code,
            };
            report(client.get(&args[2]).await)
        }
        "post" => {
            if args.len() < 3 {
                eprintln!("Usage: evaste post <url> [json-body]");
                return ExitCode::from(1);
            }
            let (client, _) = match build_client() {
                Ok(c) => c,
                Err(code) => return code,
            };
            post(&client, &args[2], args.get(3).map(String::as_str)).await
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("evaste {}", evaste::VERSION);
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Evaste - Cookie-Session Authentication for HTTP Clients

USAGE:
    evaste <COMMAND> [OPTIONS]

COMMANDS:
    whoami                  Resolve the logged-in user or print the login redirect
    get <url>               Send an authenticated GET request
    post <url> [json-body]  Send an authenticated POST request with CSRF token
    help                    Show this help message
    version                 Show version information

ENVIRONMENT:
    EVASTE_CONFIG           Path to a JSON settings file (camelCase keys)
    RUST_LOG                Log filter, e.g. evaste=debug

EXAMPLES:
    EVASTE_CONFIG=auth.json evaste whoami
    EVASTE_CONFIG=auth.json evaste post https://api.example.com/v1/items '{{"name":"x"}}'
"#
    );
}

fn build_client() -> Result<(AuthenticatedClient, Arc<RecordingNavigator>), ExitCode> {
    let path = match env::var("EVASTE_CONFIG") {
        Ok(p) => p,
        Err(_) => {
            eprintln!("EVASTE_CONFIG is not set");
            return Err(ExitCode::from(1));
        }
    };

    let settings = match AuthSettings::from_file(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load {}: {}", path, e);
            return Err(ExitCode::from(1));
        }
    };

    let navigator = Arc::new(RecordingNavigator::new());
    let config = AuthConfig::from_settings(settings)
        .logging_service(Arc::new(TracingLoggingService))
        .navigator(navigator.clone());

    match AuthenticatedClient::new(&config) {
        Ok(client) => Ok((client, navigator)),
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            Err(ExitCode::from(1))
        }
    }
}

async fn whoami(client: &AuthenticatedClient, navigator: &RecordingNavigator) -> ExitCode {
    match client.ensure_authenticated_user("").await {
        Ok(Some(session)) => {
            let claims = session.access_token.claims();
            println!("\n=== Authenticated ===");
            println!("User ID: {}", session.authenticated_user.user_id);
            println!("Username: {}", session.authenticated_user.username);
            println!("Administrator: {}", session.authenticated_user.administrator);
            if !session.authenticated_user.roles.is_empty() {
                println!("Roles: {}", session.authenticated_user.roles.join(", "));
            }
            if let Some(ref email) = claims.email {
                println!("Email: {}", email);
            }
            println!("Expires: {}", claims.expires_at);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("\nNo session.");
            if let Some(target) = navigator.last_redirect() {
                println!("Log in at: {}", target);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to resolve user: {}", e);
            if let Some(target) = navigator.last_redirect() {
                eprintln!("Redirected to: {}", target);
            }
            ExitCode::from(1)
        }
    }
}

async fn post(client: &AuthenticatedClient, url: &str, body: Option<&str>) -> ExitCode {
    let value = match body.map(|b| serde_json::from_str::<serde_json::Value>(b)) {
        Some(Ok(v)) => v,
        Some(Err(e)) => {
            eprintln!("Body is not valid JSON: {}", e);
            return ExitCode::from(1);
        }
        None => serde_json::Value::Object(Default::default()),
    };

    report(client.post_json(url, &value).await)
}

fn report(result: evaste::Result<Response>) -> ExitCode {
    match result {
        Ok(response) => {
            println!("\n=== Response ===");
            println!("Status: {}", response.status);
            println!("URL: {}", response.url);
            println!("Content-Type: {:?}", response.content_type());
            println!("Size: {} bytes", response.body_len());
            println!("Time: {}ms", response.response_time_ms);
            println!("\n{}", response.text_lossy());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Request failed: {}", e);
            if let Some(normalized) = e.interceptor_error() {
                if let Some(ref body) = normalized.response_body {
                    if !body.is_empty() {
                        eprintln!("{}", body);
                    }
                }
            }
            ExitCode::from(1)
        }
    }
}
