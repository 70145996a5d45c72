// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Access bot engine: stream watcher, handlers and the orchestrating app

mod app;
mod dispatch;
mod error;
mod handlers;
mod record;
mod watcher;

pub use app::{App, AppConfig, AppDeps, ACCESS_REQUEST_KIND};
pub use dispatch::dispatch;
pub use error::HandleError;
pub use handlers::{AccessRequestHandler, CallbackHandler, DEFAULT_LEASE_TTL};
pub use record::{Lease, Refusal, RequestRecord};
pub use watcher::{StreamWatcher, WatchError, WatcherConfig};
