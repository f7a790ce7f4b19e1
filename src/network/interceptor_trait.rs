// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request/response interceptor traits and the ordered chain that runs them

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::http::{Request, Response};

/// A step applied to every outgoing request before it is sent.
///
/// Returning `Err` aborts the request: it is not sent and the error reaches
/// the caller unchanged.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Step name, used in logs and [`InterceptorChain::request_steps`]
    fn name(&self) -> &'static str;

    /// Filter - return true if this step should handle the request
    fn should_intercept(&self, _request: &Request) -> bool {
        true
    }

    /// Called before a request is sent
    async fn before_request(&self, request: &mut Request) -> Result<()>;
}

/// A step applied to every response or transport error.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// Step name, used in logs and [`InterceptorChain::response_steps`]
    fn name(&self) -> &'static str;

    /// Called with a successful (2xx) response
    async fn after_response(&self, _request_url: &str, response: Response) -> Result<Response> {
        Ok(response)
    }

    /// Called with a failed request; must hand an error back
    async fn on_error(&self, request_url: &str, error: Error) -> Error;
}

/// Ordered interceptor pipeline.
///
/// Steps run in the order they were added, independent of how the
/// underlying transport orders its own hooks.
#[derive(Default, Clone)]
pub struct InterceptorChain {
    request_steps: Vec<Arc<dyn RequestInterceptor>>,
    response_steps: Vec<Arc<dyn ResponseInterceptor>>,
}

impl InterceptorChain {
    /// Create a new empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request step
    pub fn add_request_step<I: RequestInterceptor + 'static>(&mut self, step: I) -> &mut Self {
        self.request_steps.push(Arc::new(step));
        self
    }

    /// Append a response step
    pub fn add_response_step(&mut self, step: Arc<dyn ResponseInterceptor>) -> &mut Self {
        self.response_steps.push(step);
        self
    }

    /// Names of the request steps in execution order
    pub fn request_steps(&self) -> Vec<&'static str> {
        self.request_steps.iter().map(|s| s.name()).collect()
    }

    /// Names of the response steps in execution order
    pub fn response_steps(&self) -> Vec<&'static str> {
        self.response_steps.iter().map(|s| s.name()).collect()
    }

    /// Run the request through every request step
    pub async fn process_request(&self, request: &mut Request) -> Result<()> {
        for step in &self.request_steps {
            if !step.should_intercept(request) {
                continue;
            }

            if let Err(e) = step.before_request(request).await {
                tracing::debug!(step = step.name(), url = %request.url, error = %e, "Request step rejected");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Run a response or error through every response step
    pub async fn process_response(
        &self,
        request_url: &str,
        result: Result<Response>,
    ) -> Result<Response> {
        match result {
            Ok(mut response) => {
                for step in &self.response_steps {
                    response = step.after_response(request_url, response).await?;
                }
                Ok(response)
            }
            Err(mut error) => {
                for step in &self.response_steps {
                    error = step.on_error(request_url, error).await;
                }
                Err(error)
            }
        }
    }
}
