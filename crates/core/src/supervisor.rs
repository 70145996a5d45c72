// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task supervision scope
//!
//! A [`Supervisor`] owns one cancellation scope and the set of tasks spawned
//! into it. Critical tasks end the scope when they return; best-effort tasks
//! only report their failures. Shutdown is either graceful (hooks, then drain
//! with a deadline) or forced (cancel and abort, no waiting).

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::id::{IdGen, UuidIdGen};
use crate::task::{TaskContext, TaskError, TaskHandle, TaskId, TaskKind};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
type TerminateHook = Box<dyn FnOnce() -> HookFuture + Send + 'static>;

/// Callback receiving every non-cancellation task failure
pub type FailureReporter = Arc<dyn Fn(&TaskFailure) + Send + Sync + 'static>;

/// Supervisor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Time slice granted to each termination hook
    #[serde(with = "humantime_serde")]
    pub hook_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            hook_timeout: Duration::from_secs(2),
        }
    }
}

/// A task that finished with an error other than cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub id: TaskId,
    pub name: String,
    pub kind: TaskKind,
    pub error: TaskError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.id, self.error)
    }
}

/// Terminal errors of a supervision scope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// One or more critical tasks failed; all failures are kept in order
    #[error("critical task failed: {}", join_failures(.0))]
    TaskFailed(Vec<TaskFailure>),
    #[error("shutdown timed out with {remaining} task(s) still running")]
    ShutdownTimedOut { remaining: usize },
}

fn join_failures(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

struct LiveTask {
    handle: TaskHandle,
    abort: AbortHandle,
}

#[derive(Default)]
struct Registry {
    live: HashMap<TaskId, LiveTask>,
    hooks: Vec<(String, TerminateHook)>,
    reporters: Vec<FailureReporter>,
    failures: Vec<TaskFailure>,
}

struct Inner {
    token: CancellationToken,
    tracker: TaskTracker,
    config: SupervisorConfig,
    id_gen: Box<dyn IdGen>,
    registry: Mutex<Registry>,
}

/// Owner of a cancellation scope and its live tasks
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("cancelled", &self.inner.token.is_cancelled())
            .field("live_tasks", &self.live_tasks())
            .finish_non_exhaustive()
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::default())
    }
}

impl Supervisor {
    /// Create a root supervisor
    pub fn new(config: SupervisorConfig) -> Self {
        Self::build(CancellationToken::new(), config, Box::new(UuidIdGen))
    }

    /// Create a supervisor whose scope ends when `parent` is cancelled
    pub fn with_parent(parent: &CancellationToken, config: SupervisorConfig) -> Self {
        Self::build(parent.child_token(), config, Box::new(UuidIdGen))
    }

    /// Replace the task ID generator (used by tests for stable IDs)
    pub fn with_id_gen(config: SupervisorConfig, id_gen: impl IdGen) -> Self {
        Self::build(CancellationToken::new(), config, Box::new(id_gen))
    }

    fn build(token: CancellationToken, config: SupervisorConfig, id_gen: Box<dyn IdGen>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                tracker: TaskTracker::new(),
                config,
                id_gen,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Spawn a best-effort task. Its failure is reported, never propagated.
    pub fn spawn<F, Fut>(&self, name: impl Into<String>, f: F) -> TaskHandle
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.spawn_kind(name.into(), TaskKind::BestEffort, f)
    }

    /// Spawn a critical task. When it returns, the scope shuts down.
    pub fn spawn_critical<F, Fut>(&self, name: impl Into<String>, f: F) -> TaskHandle
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.spawn_kind(name.into(), TaskKind::Critical, f)
    }

    fn spawn_kind<F, Fut>(&self, name: String, kind: TaskKind, f: F) -> TaskHandle
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let id = self.inner.id_gen.next_id();
        let handle = TaskHandle::new(id.clone(), name, kind);
        let ctx = TaskContext::new(handle.clone(), self.inner.token.child_token(), self.clone());
        let fut = f(ctx);

        let running = handle.clone();
        let join = tokio::spawn(async move {
            running.mark_running();
            fut.await
        });

        // Register before the completion watcher exists so finish() always
        // finds the entry it removes.
        self.lock().live.insert(
            id,
            LiveTask {
                handle: handle.clone(),
                abort: join.abort_handle(),
            },
        );
        debug!(task = %handle.name(), id = %handle.id(), ?kind, "task spawned");

        let supervisor = self.clone();
        let finished = handle.clone();
        self.inner.tracker.spawn(async move {
            let outcome = match join.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(TaskError::Panicked(panic_message(e.into_panic()))),
                Err(_) => Err(TaskError::Cancelled),
            };
            supervisor.finish(&finished, outcome);
        });

        handle
    }

    /// Record the outcome in the scope before publishing it on the handle,
    /// so a waiter on the handle already sees the scope's terminal error.
    fn finish(&self, handle: &TaskHandle, outcome: Result<(), TaskError>) {
        let failure = match &outcome {
            Err(e) if !e.is_cancelled() => Some(TaskFailure {
                id: handle.id().clone(),
                name: handle.name().to_string(),
                kind: handle.kind(),
                error: e.clone(),
            }),
            _ => None,
        };

        let reporters = {
            let mut registry = self.lock();
            registry.live.remove(handle.id());
            if let Some(failure) = &failure {
                if handle.kind() == TaskKind::Critical {
                    registry.failures.push(failure.clone());
                }
            }
            registry.reporters.clone()
        };

        if handle.kind() == TaskKind::Critical && !self.inner.token.is_cancelled() {
            info!(task = %handle.name(), "critical task returned; terminating scope");
            self.inner.token.cancel();
        }

        handle.finish(outcome);

        match (handle.kind(), &failure) {
            (TaskKind::Critical, Some(failure)) => {
                error!(task = %handle.name(), id = %handle.id(), error = %failure.error, "critical task failed");
            }
            (TaskKind::Critical, None) => {
                info!(task = %handle.name(), id = %handle.id(), "critical task finished");
            }
            (TaskKind::BestEffort, Some(failure)) => {
                warn!(task = %handle.name(), id = %handle.id(), error = %failure.error, "task failed");
            }
            (TaskKind::BestEffort, None) => {
                debug!(task = %handle.name(), id = %handle.id(), "task finished");
            }
        }

        if let Some(failure) = &failure {
            for report in &reporters {
                report(failure);
            }
        }
    }

    /// Register a hook run once during graceful shutdown, in registration order
    pub fn on_terminate<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: TerminateHook = Box::new(move || Box::pin(hook()));
        self.lock().hooks.push((name.into(), hook));
    }

    /// Register a callback invoked for every task failure
    pub fn on_failure(&self, reporter: impl Fn(&TaskFailure) + Send + Sync + 'static) {
        self.lock().reporters.push(Arc::new(reporter));
    }

    /// Graceful shutdown: cancel cooperatively, run termination hooks, then
    /// wait up to `timeout` for live tasks to drain. Falls back to
    /// [`close`](Self::close) when the deadline passes.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), SupervisorError> {
        info!(live_tasks = self.live_tasks(), "shutting down");
        self.inner.token.cancel();
        self.run_hooks().await;

        self.inner.tracker.close();
        let timed_out = match tokio::time::timeout(timeout, self.inner.tracker.wait()).await {
            Ok(()) => None,
            Err(_) => {
                let remaining = self.live_tasks();
                warn!(remaining, "graceful shutdown timed out; forcing close");
                self.close();
                Some(remaining)
            }
        };

        self.terminal_error()?;
        match timed_out {
            Some(remaining) => Err(SupervisorError::ShutdownTimedOut { remaining }),
            None => {
                info!("shutdown complete");
                Ok(())
            }
        }
    }

    async fn run_hooks(&self) {
        let hooks = std::mem::take(&mut self.lock().hooks);
        for (name, hook) in hooks {
            debug!(hook = %name, "running terminate hook");
            if tokio::time::timeout(self.inner.config.hook_timeout, hook())
                .await
                .is_err()
            {
                warn!(hook = %name, timeout = ?self.inner.config.hook_timeout, "terminate hook timed out");
            }
        }
    }

    /// Forced shutdown: cancel the scope and abort live tasks without waiting
    pub fn close(&self) {
        self.inner.token.cancel();
        self.inner.tracker.close();
        let registry = self.lock();
        for task in registry.live.values() {
            debug!(task = %task.handle.name(), id = %task.handle.id(), "aborting task");
            task.abort.abort();
        }
    }

    /// Wait until the scope terminates and return its terminal error, if any
    pub async fn wait(&self) -> Result<(), SupervisorError> {
        self.inner.token.cancelled().await;
        self.terminal_error()
    }

    /// Aggregated critical failures recorded so far
    pub fn terminal_error(&self) -> Result<(), SupervisorError> {
        let registry = self.lock();
        if registry.failures.is_empty() {
            Ok(())
        } else {
            Err(SupervisorError::TaskFailed(registry.failures.clone()))
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// A token cancelled when this scope terminates
    pub fn child_token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    pub fn live_tasks(&self) -> usize {
        self.lock().live.len()
    }

    /// Handles of all live tasks
    pub fn tasks(&self) -> Vec<TaskHandle> {
        self.lock()
            .live
            .values()
            .map(|t| t.handle.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
