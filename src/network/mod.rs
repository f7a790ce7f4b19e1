// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Interceptor pipeline
//!
//! Every request made through the authenticated client passes the request
//! steps in order (`csrf`, then `auth-freshness`); every failure passes the
//! response steps (`error-normalizer`) before it reaches the caller.

mod interceptor_trait;
mod steps;

pub use interceptor_trait::{InterceptorChain, RequestInterceptor, ResponseInterceptor};
pub use steps::{AuthFreshnessStep, CsrfStep, ErrorNormalizer};
