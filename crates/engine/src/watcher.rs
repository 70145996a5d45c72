// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-lived change stream subscription
//!
//! The watcher subscribes, waits for `Init`, announces readiness once and
//! then hands every event to a best-effort handler task without waiting for
//! it. Transient stream failures reconnect with capped exponential backoff;
//! a successful `Init` resets the backoff.

use std::sync::Arc;
use std::time::Duration;

use ab_adapters::{ChangeStream, StreamError, Subscription};
use ab_core::{
    Backoff, BackoffConfig, ChangeEvent, Handler, Supervisor, TaskContext, TaskError, TaskHandle,
    WatchFilter,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dispatch::dispatch;

/// Stream watcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// How long a fresh subscription may take to deliver `Init`
    #[serde(with = "humantime_serde")]
    pub init_timeout: Duration,
    /// Deadline for each handler invocation
    #[serde(with = "humantime_serde")]
    pub handler_timeout: Duration,
    /// Consecutive failed connection attempts tolerated before the first
    /// `Init`. Zero retries forever.
    pub startup_attempts: u32,
    pub backoff: BackoffConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(5),
            handler_timeout: Duration::from_secs(10),
            startup_attempts: 3,
            backoff: BackoffConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("change stream failed: {0}")]
    Stream(StreamError),
    #[error("change stream unavailable after {attempts} attempt(s): {last}")]
    Startup { attempts: u32, last: StreamError },
}

/// Keeps a filtered subscription open and dispatches its events
pub struct StreamWatcher<S, H> {
    stream: S,
    filter: WatchFilter,
    handler: Arc<H>,
    config: WatcherConfig,
}

impl<S, H> StreamWatcher<S, H>
where
    S: ChangeStream,
    H: Handler<ChangeEvent>,
{
    pub fn new(stream: S, filter: WatchFilter, handler: H, config: WatcherConfig) -> Self {
        Self::with_shared_handler(stream, filter, Arc::new(handler), config)
    }

    pub fn with_shared_handler(
        stream: S,
        filter: WatchFilter,
        handler: Arc<H>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            stream,
            filter,
            handler,
            config,
        }
    }

    /// Spawn the watcher as a critical task of `supervisor`
    pub fn spawn(self, supervisor: &Supervisor) -> TaskHandle {
        supervisor.spawn_critical("stream-watcher", move |ctx| async move {
            self.run(&ctx).await.map_err(TaskError::failed)
        })
    }

    /// Task body. Returns `Ok` when the owning scope is cancelled.
    pub async fn run(&self, ctx: &TaskContext) -> Result<(), WatchError> {
        let mut backoff = Backoff::new(self.config.backoff.clone());
        let mut ready = false;
        let mut failures = 0u32;

        loop {
            if ctx.is_cancelled() {
                return Ok(());
            }

            let error = match self.session(ctx, &mut ready, &mut backoff).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if !error.is_transient() {
                if error == StreamError::Cancelled {
                    info!("change stream cancelled by server");
                    return Ok(());
                }
                return Err(WatchError::Stream(error));
            }

            if !ready {
                failures += 1;
                let limit = self.config.startup_attempts;
                if limit > 0 && failures >= limit {
                    warn!(attempts = failures, error = %error, "giving up on change stream");
                    return Err(WatchError::Startup {
                        attempts: failures,
                        last: error,
                    });
                }
            }

            warn!(error = %error, retry = backoff.attempts() + 1, "change stream interrupted; reconnecting");
            if !backoff.wait(ctx.token()).await {
                return Ok(());
            }
        }
    }

    /// One subscription, start to end. `Ok` means the scope was cancelled.
    async fn session(
        &self,
        ctx: &TaskContext,
        ready: &mut bool,
        backoff: &mut Backoff,
    ) -> Result<(), StreamError> {
        let mut subscription = tokio::select! {
            _ = ctx.cancelled() => return Ok(()),
            sub = self.stream.subscribe(&self.filter) => sub?,
        };

        let first = tokio::select! {
            _ = ctx.cancelled() => return Ok(()),
            first = tokio::time::timeout(self.config.init_timeout, subscription.next()) => match first {
                Ok(event) => event?,
                Err(_) => {
                    return Err(StreamError::Connection(format!(
                        "no init within {:?}",
                        self.config.init_timeout
                    )))
                }
            },
        };
        if !first.is_init() {
            return Err(StreamError::Fatal(format!(
                "expected init, got {:?} for {}/{}",
                first.op, first.kind, first.id
            )));
        }

        backoff.reset();
        if *ready {
            info!("change stream re-established");
        } else {
            *ready = true;
            ctx.set_ready(true);
            info!(kinds = self.filter.kinds.len(), "stream watcher ready");
        }

        self.pump(ctx, &mut subscription).await
    }

    async fn pump(
        &self,
        ctx: &TaskContext,
        subscription: &mut Subscription,
    ) -> Result<(), StreamError> {
        loop {
            let event = tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                event = subscription.next() => event?,
            };

            if event.is_init() {
                debug!("ignoring repeated init");
                continue;
            }
            if !self.filter.matches(&event) {
                continue;
            }

            debug!(op = ?event.op, kind = %event.kind, id = %event.id, "dispatching change");
            let name = format!("change:{}:{}", event.kind, event.id);
            dispatch(
                ctx.supervisor(),
                name,
                Arc::clone(&self.handler),
                event,
                self.config.handler_timeout,
            );
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
