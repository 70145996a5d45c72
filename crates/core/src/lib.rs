// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ab-core: job supervision runtime and shared types for access bots
//!
//! This crate provides:
//! - Supervised tasks with readiness and cancellation ([`Supervisor`], [`TaskHandle`])
//! - Capped exponential backoff for reconnect loops
//! - Change events, subscription filters and the uniform [`Handler`] shape
//! - Length-prefixed JSON framing shared by sockets

pub mod backoff;
pub mod clock;
pub mod event;
pub mod filter;
pub mod handler;
pub mod id;
pub mod request;
pub mod supervisor;
pub mod task;
pub mod wire;

pub use backoff::{Backoff, BackoffConfig};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{ChangeEvent, OpType};
pub use filter::{KindPattern, WatchFilter};
pub use handler::{handler_fn, FnHandler, Handler};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use request::{AccessRequest, Callback, CallbackAction, RequestState, Resolution, Review};
pub use supervisor::{
    FailureReporter, Supervisor, SupervisorConfig, SupervisorError, TaskFailure,
};
pub use task::{TaskContext, TaskError, TaskHandle, TaskId, TaskKind, TaskState};
pub use tokio_util::sync::CancellationToken;
