// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use ab_core::{AccessRequest, Resolution, Review};
use async_trait::async_trait;
use tracing::Instrument;

use crate::docs::{DocError, Document, DocumentAdapter, Precondition, Revision};
use crate::notify::{NotifyError, Notifier};

/// Wrapper that adds tracing to any DocumentAdapter
#[derive(Clone)]
pub struct TracedDocuments<D> {
    inner: D,
}

impl<D> TracedDocuments<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

#[async_trait]
impl<D: DocumentAdapter> DocumentAdapter for TracedDocuments<D> {
    async fn get(&self, key: &str) -> Result<Option<Document>, DocError> {
        let result = self.inner.get(key).await;
        tracing::trace!(
            key,
            revision = ?result.as_ref().ok().and_then(|d| d.as_ref().map(|d| d.revision.0)),
            "document read"
        );
        result
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        precondition: Precondition,
    ) -> Result<Revision, DocError> {
        let span = tracing::info_span!("docs.put", key, ?precondition);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.put(key, value, precondition).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(revision) => tracing::debug!(revision = revision.0, elapsed_ms, "committed"),
                // Lost races are routine under optimistic concurrency
                Err(e @ (DocError::AlreadyExists(_) | DocError::RevisionMismatch { .. })) => {
                    tracing::debug!(elapsed_ms, error = %e, "precondition failed")
                }
                Err(e) => tracing::error!(elapsed_ms, error = %e, "put failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any Notifier
#[derive(Clone)]
pub struct TracedNotifier<N> {
    inner: N,
}

impl<N> TracedNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<N: Notifier> Notifier for TracedNotifier<N> {
    async fn create_ticket(&self, request: &AccessRequest) -> Result<String, NotifyError> {
        let span = tracing::info_span!("notify.create_ticket", request = %request.id);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.create_ticket(request).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(ticket_id) => tracing::info!(ticket_id, elapsed_ms, "ticket created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "create failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn post_review(&self, ticket_id: &str, review: &Review) -> Result<(), NotifyError> {
        let span = tracing::info_span!("notify.post_review", ticket_id, author = %review.author);
        async {
            let result = self.inner.post_review(ticket_id, review).await;
            match &result {
                Ok(()) => tracing::info!("review posted"),
                Err(e) => tracing::error!(error = %e, "post failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn resolve_ticket(
        &self,
        ticket_id: &str,
        resolution: Resolution,
    ) -> Result<(), NotifyError> {
        let span = tracing::info_span!("notify.resolve_ticket", ticket_id, %resolution);
        async {
            let result = self.inner.resolve_ticket(ticket_id, resolution).await;
            match &result {
                Ok(()) => tracing::info!("ticket resolved"),
                Err(e) => tracing::error!(error = %e, "resolve failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
