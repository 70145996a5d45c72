// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notifier that only logs.

use ab_core::{AccessRequest, Resolution, Review};
use async_trait::async_trait;
use tracing::info;

use super::{NotifyError, Notifier};

/// Notifier that writes each side effect to the log.
///
/// Used when no messaging platform is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn create_ticket(&self, request: &AccessRequest) -> Result<String, NotifyError> {
        let ticket_id = format!("ticket-{}", uuid::Uuid::new_v4());
        info!(request = %request.id, user = %request.user, ticket = %ticket_id, "ticket created");
        Ok(ticket_id)
    }

    async fn post_review(&self, ticket_id: &str, review: &Review) -> Result<(), NotifyError> {
        info!(ticket = ticket_id, author = %review.author, approve = review.approve, "review posted");
        Ok(())
    }

    async fn resolve_ticket(
        &self,
        ticket_id: &str,
        resolution: Resolution,
    ) -> Result<(), NotifyError> {
        info!(ticket = ticket_id, %resolution, "ticket resolved");
        Ok(())
    }
}
