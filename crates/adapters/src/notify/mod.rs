// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reviewer-facing notification adapters (tickets, chat messages)

mod log;

pub use log::LogNotifier;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifier, NotifyCall};

use ab_core::{AccessRequest, Resolution, Review};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("notification failed: {0}")]
    Failed(String),
    #[error("ticket not found: {0}")]
    TicketNotFound(String),
}

/// External representation of access requests for reviewers
#[async_trait]
pub trait Notifier: Clone + Send + Sync + 'static {
    /// Open a ticket (or post a message) for a new request, returning its id
    async fn create_ticket(&self, request: &AccessRequest) -> Result<String, NotifyError>;

    /// Add a review to an existing ticket
    async fn post_review(&self, ticket_id: &str, review: &Review) -> Result<(), NotifyError>;

    /// Mark a ticket with the request's final outcome
    async fn resolve_ticket(
        &self,
        ticket_id: &str,
        resolution: Resolution,
    ) -> Result<(), NotifyError>;
}
