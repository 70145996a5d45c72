// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notifier for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ab_core::{AccessRequest, Resolution, Review};
use async_trait::async_trait;

use super::{NotifyError, Notifier};

/// Recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyCall {
    CreateTicket {
        request_id: String,
        ticket_id: String,
    },
    PostReview {
        ticket_id: String,
        author: String,
    },
    ResolveTicket {
        ticket_id: String,
        resolution: Resolution,
    },
}

#[derive(Default)]
struct FakeState {
    calls: Vec<NotifyCall>,
    failures: VecDeque<NotifyError>,
    next_ticket: u64,
}

/// Fake notifier that records calls and hands out sequential ticket ids
#[derive(Clone, Default)]
pub struct FakeNotifier {
    state: Arc<Mutex<FakeState>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded notifications
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.lock().calls.clone()
    }

    /// Fail the next call with `error` (the call is not recorded)
    pub fn fail_next(&self, error: NotifyError) {
        self.lock().failures.push_back(error);
    }

    pub fn tickets_created(&self) -> usize {
        self.count(|c| matches!(c, NotifyCall::CreateTicket { .. }))
    }

    pub fn reviews_posted(&self) -> usize {
        self.count(|c| matches!(c, NotifyCall::PostReview { .. }))
    }

    pub fn tickets_resolved(&self) -> usize {
        self.count(|c| matches!(c, NotifyCall::ResolveTicket { .. }))
    }

    fn count(&self, pred: impl Fn(&NotifyCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: impl FnOnce(&mut FakeState) -> NotifyCall) -> Result<(), NotifyError> {
        let mut state = self.lock();
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        let call = call(&mut state);
        state.calls.push(call);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn create_ticket(&self, request: &AccessRequest) -> Result<String, NotifyError> {
        let mut ticket_id = String::new();
        self.record(|state| {
            state.next_ticket += 1;
            ticket_id = format!("ticket-{}", state.next_ticket);
            NotifyCall::CreateTicket {
                request_id: request.id.clone(),
                ticket_id: ticket_id.clone(),
            }
        })?;
        Ok(ticket_id)
    }

    async fn post_review(&self, ticket_id: &str, review: &Review) -> Result<(), NotifyError> {
        self.record(|_| NotifyCall::PostReview {
            ticket_id: ticket_id.to_string(),
            author: review.author.clone(),
        })
    }

    async fn resolve_ticket(
        &self,
        ticket_id: &str,
        resolution: Resolution,
    ) -> Result<(), NotifyError> {
        self.record(|_| NotifyCall::ResolveTicket {
            ticket_id: ticket_id.to_string(),
            resolution,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
