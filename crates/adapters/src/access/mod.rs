// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access-control service adapters

mod log;

pub use log::LogAccessAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AccessCall, FakeAccessAdapter};

use ab_core::Resolution;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("access request not found: {0}")]
    NotFound(String),
    #[error("access request {0} is already resolved")]
    AlreadyResolved(String),
    #[error("access service error: {0}")]
    Failed(String),
}

/// Adapter for transitioning access requests on the access-control service
#[async_trait]
pub trait AccessAdapter: Clone + Send + Sync + 'static {
    async fn set_state(
        &self,
        request_id: &str,
        resolution: Resolution,
        reviewer: &str,
        reason: Option<&str>,
    ) -> Result<(), AccessError>;
}
