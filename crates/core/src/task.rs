// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervised task handles
//!
//! A task is one unit of asynchronous work owned by a [`Supervisor`]. Its
//! lifecycle is `Pending -> Running -> (Ready ->) Done`; `Done` is terminal.
//! Readiness is optional and announced at most once. Both the "became ready"
//! and the "finished" notifications are observed through a single `watch`
//! channel, so any number of waiters can attach at any time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::supervisor::Supervisor;

/// Opaque identifier for a spawned task
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a task's completion affects its owning scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Completion (success or failure) tears down the whole scope
    Critical,
    /// Failure is reported but isolated from siblings and the scope
    BestEffort,
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Ready,
    Done,
}

/// Error outcome of a task
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task observed cancellation of its scope and stopped
    #[error("task cancelled")]
    Cancelled,
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Failed(String),
}

impl TaskError {
    /// Build a failure from any error, keeping its source chain in the message
    pub fn failed(err: impl std::error::Error) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        TaskError::Failed(message)
    }

    /// Cancellation is a clean stop, never a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

#[derive(Debug, Clone)]
struct Status {
    state: TaskState,
    /// First readiness announcement, if any
    announced: Option<bool>,
    outcome: Option<Result<(), TaskError>>,
}

#[derive(Debug)]
struct TaskInner {
    id: TaskId,
    name: String,
    kind: TaskKind,
    status: watch::Sender<Status>,
}

/// Cloneable handle to a spawned task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    inner: Arc<TaskInner>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, name: String, kind: TaskKind) -> Self {
        let (status, _) = watch::channel(Status {
            state: TaskState::Pending,
            announced: None,
            outcome: None,
        });
        Self {
            inner: Arc::new(TaskInner {
                id,
                name,
                kind,
                status,
            }),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> TaskKind {
        self.inner.kind
    }

    pub fn state(&self) -> TaskState {
        self.inner.status.borrow().state
    }

    pub fn is_done(&self) -> bool {
        self.state() == TaskState::Done
    }

    /// The task's outcome, once it is done
    pub fn outcome(&self) -> Option<Result<(), TaskError>> {
        self.inner.status.borrow().outcome.clone()
    }

    pub(crate) fn mark_running(&self) {
        self.inner.status.send_if_modified(|status| {
            if status.state != TaskState::Pending {
                return false;
            }
            status.state = TaskState::Running;
            true
        });
    }

    /// Announce readiness. Only the first announcement counts, and nothing
    /// is accepted once the task is done.
    pub(crate) fn set_ready(&self, ready: bool) -> bool {
        self.inner.status.send_if_modified(|status| {
            if status.announced.is_some() || status.state == TaskState::Done {
                return false;
            }
            status.announced = Some(ready);
            if ready {
                status.state = TaskState::Ready;
            }
            true
        })
    }

    pub(crate) fn finish(&self, outcome: Result<(), TaskError>) {
        self.inner.status.send_if_modified(|status| {
            if status.state == TaskState::Done {
                return false;
            }
            status.state = TaskState::Done;
            status.outcome = Some(outcome);
            true
        });
    }

    /// Wait until the task announces readiness or finishes.
    ///
    /// Returns `Ok(true)` once ready. A task that finishes without becoming
    /// ready yields `Ok(false)` when it succeeded, announced `false` or was
    /// cancelled, and `Err` with its failure otherwise.
    pub async fn wait_ready(&self) -> Result<bool, TaskError> {
        let mut rx = self.inner.status.subscribe();
        let status = match rx
            .wait_for(|s| s.announced.is_some() || s.outcome.is_some())
            .await
        {
            Ok(status) => status.clone(),
            Err(_) => return Ok(false),
        };

        if let Some(ready) = status.announced {
            return Ok(ready);
        }
        match status.outcome {
            Some(Err(e)) if !e.is_cancelled() => Err(e),
            _ => Ok(false),
        }
    }

    /// Wait for the task to finish and return its outcome
    pub async fn wait(&self) -> Result<(), TaskError> {
        let mut rx = self.inner.status.subscribe();
        let status = match rx.wait_for(|s| s.outcome.is_some()).await {
            Ok(status) => status.clone(),
            Err(_) => return Err(TaskError::Cancelled),
        };
        status.outcome.unwrap_or(Err(TaskError::Cancelled))
    }
}

/// Execution context handed to a task body
#[derive(Debug, Clone)]
pub struct TaskContext {
    handle: TaskHandle,
    token: CancellationToken,
    supervisor: Supervisor,
}

impl TaskContext {
    pub(crate) fn new(handle: TaskHandle, token: CancellationToken, supervisor: Supervisor) -> Self {
        Self {
            handle,
            token,
            supervisor,
        }
    }

    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    /// Cancellation token scoped to this task (a child of the supervisor's)
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Announce readiness; returns false if readiness was already announced
    pub fn set_ready(&self, ready: bool) -> bool {
        self.handle.set_ready(ready)
    }

    /// Supervisor owning this task, for spawning siblings
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
