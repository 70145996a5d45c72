// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run one payload through a handler on its own best-effort task

use std::sync::Arc;
use std::time::Duration;

use ab_core::{Handler, Supervisor, TaskError, TaskHandle};

/// Spawn `handler.handle(payload)` as a best-effort task bounded by `timeout`.
///
/// The handler's token is the task's own token. A handler error observed
/// after the scope was cancelled counts as cancellation, not failure.
pub fn dispatch<H, P>(
    supervisor: &Supervisor,
    name: impl Into<String>,
    handler: Arc<H>,
    payload: P,
    timeout: Duration,
) -> TaskHandle
where
    H: Handler<P>,
    P: Send + 'static,
{
    supervisor.spawn(name, move |ctx| async move {
        let token = ctx.token().clone();
        match tokio::time::timeout(timeout, handler.handle(token, payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) if ctx.is_cancelled() => Err(TaskError::Cancelled),
            Ok(Err(e)) => Err(TaskError::failed(e)),
            Err(_) => Err(TaskError::TimedOut(timeout)),
        }
    })
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
