// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile change events and platform callbacks into side effects
//!
//! Both handlers funnel through the per-request [`RequestRecord`]. Before an
//! external call a handler takes a lease on it in the record; the call's
//! result is committed afterwards and a failed call releases the lease, so
//! racing handlers (or a replayed stream after reconnect) do not repeat a
//! side effect and a failed one is retried by the next event.

use std::sync::Arc;
use std::time::Duration;

use ab_adapters::{AccessAdapter, DocumentAdapter, Notifier};
use ab_core::{
    AccessRequest, Callback, ChangeEvent, Clock, Handler, IdGen, OpType, Resolution, SystemClock,
    UuidIdGen,
};
use ab_storage::{RecordStore, StoreError};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::HandleError;
use crate::record::{Lease, Refusal, RequestRecord};

/// How long a handler may hold a lease before another may take over
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(30);

/// Handles `access_request` change events
#[derive(Clone)]
pub struct AccessRequestHandler<D, N, C = SystemClock> {
    records: RecordStore<D, RequestRecord>,
    notifier: N,
    clock: C,
    owners: Arc<dyn IdGen>,
    lease_ttl: Duration,
}

impl<D, N> AccessRequestHandler<D, N>
where
    D: DocumentAdapter,
    N: Notifier,
{
    pub fn new(records: RecordStore<D, RequestRecord>, notifier: N) -> Self {
        Self::with_clock(records, notifier, SystemClock)
    }
}

impl<D, N, C> AccessRequestHandler<D, N, C>
where
    D: DocumentAdapter,
    N: Notifier,
    C: Clock,
{
    pub fn with_clock(records: RecordStore<D, RequestRecord>, notifier: N, clock: C) -> Self {
        Self {
            records,
            notifier,
            clock,
            owners: Arc::new(UuidIdGen),
            lease_ttl: DEFAULT_LEASE_TTL,
        }
    }

    /// Set the lease duration. Should be at least the handler timeout.
    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    /// Name lease owners from `owners` instead of random ids
    pub fn with_owners(mut self, owners: impl IdGen) -> Self {
        self.owners = Arc::new(owners);
        self
    }

    fn lease(&self, now_ms: u64) -> Lease {
        let ttl_ms = u64::try_from(self.lease_ttl.as_millis()).unwrap_or(u64::MAX);
        Lease::new(
            self.owners.next_id().to_string(),
            now_ms.saturating_add(ttl_ms),
        )
    }

    /// Track a pending request and open its ticket unless that is done or
    /// in progress elsewhere
    async fn open(
        &self,
        cancel: &CancellationToken,
        request: &AccessRequest,
    ) -> Result<(), HandleError> {
        let now = self.clock.epoch_ms();
        let lease = self.lease(now);
        let initial = RequestRecord {
            ticket_lease: Some(lease.clone()),
            ..RequestRecord::new()
        };
        match self.records.create(cancel, &request.id, initial).await {
            Ok(_) => {}
            Err(StoreError::AlreadyExists(_)) => {
                let claimed = self
                    .records
                    .update(cancel, &request.id, |r| r.claim_ticket(&lease, now))
                    .await;
                match claimed {
                    Ok(_) => {
                        debug!(request = %request.id, owner = %lease.owner, "retrying ticket creation");
                    }
                    Err(StoreError::Refused(
                        refusal @ (Refusal::TicketExists | Refusal::Leased),
                    )) => {
                        debug!(request = %request.id, %refusal, "ticket handled elsewhere");
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        let ticket_id = match self.notifier.create_ticket(request).await {
            Ok(ticket_id) => ticket_id,
            Err(e) => {
                self.release(cancel, &request.id, "ticket", |r| {
                    r.release_ticket(&lease.owner)
                })
                .await;
                return Err(e.into());
            }
        };
        info!(request = %request.id, ticket = %ticket_id, "ticket created");

        let record = match self
            .records
            .update(cancel, &request.id, |r| r.with_ticket(&ticket_id))
            .await
        {
            Ok(record) => record,
            Err(StoreError::Refused(Refusal::TicketExists)) => {
                // Our lease expired mid-call and a successor got there first
                warn!(request = %request.id, ticket = %ticket_id, "duplicate ticket created");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // Resolved while the ticket was being created
        if let Some(resolution) = record.resolution {
            self.notifier.resolve_ticket(&ticket_id, resolution).await?;
            info!(request = %request.id, %resolution, "ticket resolved");
        }
        Ok(())
    }

    /// Post reviews the ticket has not seen yet
    async fn sync_reviews(
        &self,
        cancel: &CancellationToken,
        request: &AccessRequest,
    ) -> Result<(), HandleError> {
        let seen = u32::try_from(request.reviews.len()).unwrap_or(u32::MAX);
        if seen == 0 {
            return Ok(());
        }

        let now = self.clock.epoch_ms();
        let lease = self.lease(now);
        let claimed = self
            .records
            .update(cancel, &request.id, |r| r.claim_reviews(seen, &lease, now))
            .await;
        let record = match claimed {
            Ok(record) => record,
            Err(StoreError::Refused(
                refusal @ (Refusal::NothingNew | Refusal::NoTicket | Refusal::Leased),
            )) => {
                debug!(request = %request.id, %refusal, "no reviews to post");
                return Ok(());
            }
            Err(StoreError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let owner = lease.owner.as_str();
        let mut posted = record.reviews;
        for review in request.reviews.iter().skip(posted as usize) {
            if let Err(e) = self.notifier.post_review(&record.ticket_id, review).await {
                self.release(cancel, &request.id, "reviews", |r| {
                    r.release_reviews(owner)
                })
                .await;
                return Err(e.into());
            }
            posted += 1;
            match self
                .records
                .update(cancel, &request.id, |r| r.advance_reviews(owner, posted))
                .await
            {
                Ok(_) => {}
                Err(StoreError::Refused(Refusal::LeaseLost)) => {
                    warn!(request = %request.id, posted, "review lease lost; stopping");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.release(cancel, &request.id, "reviews", |r| {
            r.release_reviews(owner)
        })
        .await;
        info!(
            request = %request.id,
            count = posted.saturating_sub(record.reviews),
            "reviews posted"
        );
        Ok(())
    }

    async fn resolve(
        &self,
        cancel: &CancellationToken,
        request_id: &str,
        resolution: Resolution,
    ) -> Result<(), HandleError> {
        let record = match self
            .records
            .update(cancel, request_id, |r| r.resolve(resolution))
            .await
        {
            Ok(record) => record,
            Err(StoreError::Refused(Refusal::AlreadyResolved(existing))) => {
                debug!(request = request_id, %existing, "already resolved");
                return Ok(());
            }
            Err(StoreError::NotFound(_)) => {
                debug!(request = request_id, "resolved before it was tracked");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // No ticket yet: whoever stores it resolves it
        if record.has_ticket() {
            self.notifier
                .resolve_ticket(&record.ticket_id, resolution)
                .await?;
            info!(request = request_id, %resolution, "ticket resolved");
        }
        Ok(())
    }

    /// Drop a lease after a failed call. Failing here only delays the
    /// retry until the lease expires.
    async fn release<F>(
        &self,
        cancel: &CancellationToken,
        request_id: &str,
        what: &str,
        transform: F,
    ) where
        F: FnMut(RequestRecord) -> Result<RequestRecord, Refusal> + Send,
    {
        if let Err(e) = self.records.update(cancel, request_id, transform).await {
            warn!(request = request_id, lease = what, error = %e, "failed to release lease");
        }
    }
}

#[async_trait]
impl<D, N, C> Handler<ChangeEvent> for AccessRequestHandler<D, N, C>
where
    D: DocumentAdapter,
    N: Notifier,
    C: Clock,
{
    type Error = HandleError;

    async fn handle(&self, cancel: CancellationToken, event: ChangeEvent) -> Result<(), HandleError> {
        match event.op {
            OpType::Init => Ok(()),
            OpType::Delete => self.resolve(&cancel, &event.id, Resolution::Expired).await,
            OpType::Put => {
                let request: AccessRequest = event
                    .decode_payload()?
                    .ok_or_else(|| HandleError::MissingPayload(event.id.clone()))?;
                match request.state.resolution() {
                    None => {
                        self.open(&cancel, &request).await?;
                        self.sync_reviews(&cancel, &request).await
                    }
                    Some(resolution) => {
                        self.sync_reviews(&cancel, &request).await?;
                        self.resolve(&cancel, &request.id, resolution).await
                    }
                }
            }
        }
    }
}

/// Handles approve/deny callbacks from the messaging platform
#[derive(Clone)]
pub struct CallbackHandler<D, A> {
    records: RecordStore<D, RequestRecord>,
    access: A,
}

impl<D, A> CallbackHandler<D, A>
where
    D: DocumentAdapter,
    A: AccessAdapter,
{
    pub fn new(records: RecordStore<D, RequestRecord>, access: A) -> Self {
        Self { records, access }
    }
}

#[async_trait]
impl<D, A> Handler<Callback> for CallbackHandler<D, A>
where
    D: DocumentAdapter,
    A: AccessAdapter,
{
    type Error = HandleError;

    /// Fails with a not-found store error if the request is not tracked yet;
    /// the platform is expected to redeliver.
    async fn handle(&self, cancel: CancellationToken, callback: Callback) -> Result<(), HandleError> {
        let record = self
            .records
            .update(&cancel, &callback.request_id, |r| r.count_callback_review())
            .await?;
        debug!(request = %callback.request_id, reviews = record.reviews, "callback review counted");

        let resolution = callback.action.resolution();
        self.access
            .set_state(
                &callback.request_id,
                resolution,
                &callback.reviewer,
                callback.reason.as_deref(),
            )
            .await?;
        info!(
            request = %callback.request_id,
            reviewer = %callback.reviewer,
            %resolution,
            "access request transitioned"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
