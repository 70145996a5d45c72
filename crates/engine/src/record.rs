// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-request reconciliation record
//!
//! Every method here is a pure transform used with `RecordStore::update`.
//! Each touches its own field and refuses instead of overwriting, so the
//! order in which racing handlers commit does not matter. External calls
//! are guarded by a [`Lease`] rather than by the field they fill in, so a
//! failed call can be retried by the next event.

use ab_core::Resolution;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the bot has already done on behalf of one access request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// External ticket (or chat message) id; empty until the ticket exists
    #[serde(default)]
    pub ticket_id: String,
    /// Number of reviews already reflected externally
    #[serde(default)]
    pub reviews: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    /// Handler currently creating the ticket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_lease: Option<Lease>,
    /// Handler currently posting reviews
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_lease: Option<Lease>,
}

/// Exclusive right to perform one side effect until `expires_ms`.
///
/// A holder that dies mid-call leaves the lease behind; once it expires the
/// next handler takes over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub owner: String,
    pub expires_ms: u64,
}

impl Lease {
    pub fn new(owner: impl Into<String>, expires_ms: u64) -> Self {
        Self {
            owner: owner.into(),
            expires_ms,
        }
    }

    fn blocks(&self, other: &Lease, now_ms: u64) -> bool {
        self.owner != other.owner && now_ms < self.expires_ms
    }
}

/// A transform declining to change the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("request already resolved as {0}")]
    AlreadyResolved(Resolution),
    #[error("ticket already created")]
    TicketExists,
    #[error("ticket not created yet")]
    NoTicket,
    #[error("no new reviews")]
    NothingNew,
    #[error("another handler holds the lease")]
    Leased,
    #[error("lease no longer held")]
    LeaseLost,
}

impl RequestRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_ticket(&self) -> bool {
        !self.ticket_id.is_empty()
    }

    /// Take the right to create the ticket
    pub fn claim_ticket(mut self, lease: &Lease, now_ms: u64) -> Result<Self, Refusal> {
        if self.has_ticket() {
            return Err(Refusal::TicketExists);
        }
        if let Some(held) = &self.ticket_lease {
            if held.blocks(lease, now_ms) {
                return Err(Refusal::Leased);
            }
        }
        self.ticket_lease = Some(lease.clone());
        Ok(self)
    }

    /// Give up a ticket lease after the ticket could not be created
    pub fn release_ticket(mut self, owner: &str) -> Result<Self, Refusal> {
        match &self.ticket_lease {
            Some(held) if held.owner == owner => {
                self.ticket_lease = None;
                Ok(self)
            }
            _ => Err(Refusal::LeaseLost),
        }
    }

    /// Store the ticket created for this request
    pub fn with_ticket(mut self, ticket_id: &str) -> Result<Self, Refusal> {
        if self.has_ticket() {
            return Err(Refusal::TicketExists);
        }
        self.ticket_id = ticket_id.to_string();
        self.ticket_lease = None;
        Ok(self)
    }

    /// Take the right to post reviews beyond `reviews`, up to `seen`
    pub fn claim_reviews(mut self, seen: u32, lease: &Lease, now_ms: u64) -> Result<Self, Refusal> {
        if !self.has_ticket() {
            return Err(Refusal::NoTicket);
        }
        if self.reviews >= seen {
            return Err(Refusal::NothingNew);
        }
        if let Some(held) = &self.review_lease {
            if held.blocks(lease, now_ms) {
                return Err(Refusal::Leased);
            }
        }
        self.review_lease = Some(lease.clone());
        Ok(self)
    }

    /// Record that the first `posted` reviews are on the ticket
    pub fn advance_reviews(mut self, owner: &str, posted: u32) -> Result<Self, Refusal> {
        if !self.review_lease.as_ref().is_some_and(|l| l.owner == owner) {
            return Err(Refusal::LeaseLost);
        }
        self.reviews = self.reviews.max(posted);
        Ok(self)
    }

    pub fn release_reviews(mut self, owner: &str) -> Result<Self, Refusal> {
        match &self.review_lease {
            Some(held) if held.owner == owner => {
                self.review_lease = None;
                Ok(self)
            }
            _ => Err(Refusal::LeaseLost),
        }
    }

    /// Count a review submitted through the messaging platform
    pub fn count_callback_review(mut self) -> Result<Self, Refusal> {
        if let Some(resolution) = self.resolution {
            return Err(Refusal::AlreadyResolved(resolution));
        }
        self.reviews = self.reviews.saturating_add(1);
        Ok(self)
    }

    /// Record the final outcome. Only the first resolution sticks.
    pub fn resolve(mut self, resolution: Resolution) -> Result<Self, Refusal> {
        if let Some(existing) = self.resolution {
            return Err(Refusal::AlreadyResolved(existing));
        }
        self.resolution = Some(resolution);
        Ok(self)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
