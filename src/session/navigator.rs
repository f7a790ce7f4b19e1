// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Navigation capability used by login/logout redirects

use parking_lot::{Mutex, RwLock};

/// Performs redirects and reports where the current navigation came from
pub trait Navigator: Send + Sync {
    /// Navigate to `url`. Fire-and-forget.
    fn redirect(&self, url: &str);

    /// Referrer of the current navigation, if known
    fn referrer(&self) -> Option<String>;
}

/// Navigator that records redirects instead of performing them.
///
/// Used by the CLI (which prints the target) and by tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    referrer: RwLock<Option<String>>,
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a navigator reporting `referrer`
    pub fn with_referrer(referrer: impl Into<String>) -> Self {
        let navigator = Self::new();
        navigator.set_referrer(Some(referrer.into()));
        navigator
    }

    pub fn set_referrer(&self, referrer: Option<String>) {
        *self.referrer.write() = referrer;
    }

    /// Most recent redirect target
    pub fn last_redirect(&self) -> Option<String> {
        self.redirects.lock().last().cloned()
    }

    /// All redirect targets, oldest first
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, url: &str) {
        tracing::info!(target_url = %url, "Redirecting");
        self.redirects.lock().push(url.to_string());
    }

    fn referrer(&self) -> Option<String> {
        self.referrer.read().clone()
    }
}
