// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the remote services an access bot talks to

pub mod access;
pub mod docs;
pub mod notify;
pub mod stream;
pub mod traced;

pub use access::{AccessAdapter, AccessError, LogAccessAdapter};
pub use docs::{DocError, Document, DocumentAdapter, MemoryDocuments, Precondition, Revision};
pub use notify::{LogNotifier, NotifyError, Notifier};
pub use stream::{
    ChangeStream, MemoryChangeFeed, SocketChangeStream, SocketFeedServer, StreamError,
    Subscription,
};
pub use traced::{TracedDocuments, TracedNotifier};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use access::{AccessCall, FakeAccessAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use docs::{DocCall, FakeDocuments};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifier, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use stream::{FakeChangeStream, Script};
