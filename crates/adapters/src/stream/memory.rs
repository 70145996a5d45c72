// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process change feed

use std::sync::{Arc, Mutex};

use ab_core::{ChangeEvent, WatchFilter};
use async_trait::async_trait;

use super::{ChangeStream, StreamError, Subscription, SubscriptionSender};

struct Subscriber {
    filter: WatchFilter,
    tx: SubscriptionSender,
}

/// Change feed that broadcasts published events to matching subscribers
#[derive(Clone, Default)]
pub struct MemoryChangeFeed {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl MemoryChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every subscriber whose filter matches
    pub fn publish(&self, event: ChangeEvent) {
        let mut subs = self.lock();
        subs.retain(|sub| !sub.tx.is_closed());
        for sub in subs.iter() {
            if sub.filter.matches(&event) {
                sub.tx.send(Ok(event.clone()));
            }
        }
    }

    /// End every open subscription with `error`
    pub fn disconnect_all(&self, error: StreamError) {
        let subs = std::mem::take(&mut *self.lock());
        tracing::debug!(count = subs.len(), %error, "disconnecting subscribers");
        for sub in subs {
            sub.tx.send(Err(error.clone()));
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subs = self.lock();
        subs.retain(|sub| !sub.tx.is_closed());
        subs.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ChangeStream for MemoryChangeFeed {
    async fn subscribe(&self, filter: &WatchFilter) -> Result<Subscription, StreamError> {
        let (tx, subscription) = Subscription::channel();
        tx.send(Ok(ChangeEvent::init()));
        self.lock().push(Subscriber {
            filter: filter.clone(),
            tx,
        });
        Ok(subscription)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
