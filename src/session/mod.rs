// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session layer: configuration, the login/logout facade and the
//! authenticated client that ties the caches and the pipeline together.

mod client;
pub(crate) mod config;
mod facade;
mod navigator;

pub use client::{get_authenticated_api_client, reset_authenticated_api_client, AuthenticatedClient};
pub use config::{AuthConfig, AuthSettings, EmptyTokenHandler, RefreshFailureHandler, SessionConfig};
pub use facade::{AuthenticatedSession, Session, SessionState};
pub use navigator::{Navigator, RecordingNavigator};
