// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted change stream for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ab_core::{ChangeEvent, WatchFilter};
use async_trait::async_trait;

use super::{ChangeStream, StreamError, Subscription, SubscriptionSender};

/// What one call to `subscribe` does
#[derive(Debug, Clone)]
pub enum Script {
    /// `subscribe` itself fails
    Refuse(StreamError),
    /// `subscribe` succeeds and delivers these items, then stays open
    Session(Vec<Result<ChangeEvent, StreamError>>),
}

impl Script {
    /// A healthy session: `Init` followed by `events`
    pub fn healthy(events: impl IntoIterator<Item = ChangeEvent>) -> Self {
        let mut items = vec![Ok(ChangeEvent::init())];
        items.extend(events.into_iter().map(Ok));
        Script::Session(items)
    }
}

#[derive(Default)]
struct FakeState {
    scripts: VecDeque<Script>,
    filters: Vec<WatchFilter>,
    open: Vec<SubscriptionSender>,
}

/// Change stream that plays back one [`Script`] per `subscribe` call.
///
/// Once the scripts run out, subscriptions open but stay silent.
#[derive(Clone, Default)]
pub struct FakeChangeStream {
    state: Arc<Mutex<FakeState>>,
}

impl FakeChangeStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scripts(scripts: impl IntoIterator<Item = Script>) -> Self {
        let stream = Self::new();
        for script in scripts {
            stream.push_script(script);
        }
        stream
    }

    pub fn push_script(&self, script: Script) {
        self.lock().scripts.push_back(script);
    }

    /// Deliver an item to the most recent open subscription
    pub fn send(&self, item: Result<ChangeEvent, StreamError>) -> bool {
        let state = self.lock();
        state.open.last().is_some_and(|tx| tx.send(item))
    }

    /// Number of `subscribe` calls so far
    pub fn subscribe_count(&self) -> usize {
        self.lock().filters.len()
    }

    /// Filters passed to each `subscribe` call
    pub fn filters(&self) -> Vec<WatchFilter> {
        self.lock().filters.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ChangeStream for FakeChangeStream {
    async fn subscribe(&self, filter: &WatchFilter) -> Result<Subscription, StreamError> {
        let mut state = self.lock();
        state.filters.push(filter.clone());

        let items = match state.scripts.pop_front() {
            Some(Script::Refuse(e)) => return Err(e),
            Some(Script::Session(items)) => items,
            None => Vec::new(),
        };

        let (tx, subscription) = Subscription::channel();
        let mut ended = false;
        for item in items {
            ended = item.is_err();
            tx.send(item);
            if ended {
                break;
            }
        }
        if !ended {
            state.open.push(tx);
        }
        Ok(subscription)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
