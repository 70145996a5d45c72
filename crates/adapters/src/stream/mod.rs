// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change stream adapters
//!
//! A subscription yields `Init` once the server has accepted the filter,
//! then `Put`/`Delete` events until it ends with an error.

mod memory;
mod socket;

pub use memory::MemoryChangeFeed;
pub use socket::{SocketChangeStream, SocketFeedServer};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeChangeStream, Script};

use ab_core::{ChangeEvent, WatchFilter};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

/// Errors from change streams
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Could not reach the stream server or the connection broke
    #[error("connection error: {0}")]
    Connection(String),
    /// The server ended the subscription
    #[error("stream closed")]
    Closed,
    #[error("subscription cancelled")]
    Cancelled,
    /// The server refused the subscription or sent something unusable
    #[error("fatal stream error: {0}")]
    Fatal(String),
}

impl StreamError {
    /// Whether reconnecting may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StreamError::Connection(_) | StreamError::Closed)
    }
}

impl From<ab_core::wire::WireError> for StreamError {
    fn from(e: ab_core::wire::WireError) -> Self {
        use ab_core::wire::WireError;
        match e {
            WireError::ConnectionClosed => StreamError::Closed,
            WireError::Io(e) => StreamError::Connection(e.to_string()),
            WireError::Timeout => StreamError::Connection("timed out".to_string()),
            WireError::Json(e) => StreamError::Fatal(format!("malformed frame: {e}")),
            e @ WireError::TooLarge { .. } => StreamError::Fatal(e.to_string()),
        }
    }
}

type Item = Result<ChangeEvent, StreamError>;

/// Sending half of a subscription, held by the stream implementation
#[derive(Debug, Clone)]
pub(crate) struct SubscriptionSender {
    tx: mpsc::UnboundedSender<Item>,
}

impl SubscriptionSender {
    /// Deliver an item. Returns false once the subscriber is gone.
    pub(crate) fn send(&self, item: Item) -> bool {
        self.tx.send(item).is_ok()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// An open subscription
///
/// Dropping it releases the underlying connection.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Item>,
    _guard: Option<DropGuard>,
}

impl Subscription {
    pub(crate) fn channel() -> (SubscriptionSender, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SubscriptionSender { tx },
            Subscription { rx, _guard: None },
        )
    }

    /// Tie a background reader to this subscription's lifetime
    pub(crate) fn with_guard(mut self, guard: DropGuard) -> Self {
        self._guard = Some(guard);
        self
    }

    /// Next event. A subscription whose sender went away reports `Closed`.
    pub async fn next(&mut self) -> Result<ChangeEvent, StreamError> {
        self.rx.recv().await.unwrap_or(Err(StreamError::Closed))
    }
}

/// Source of change events
#[async_trait]
pub trait ChangeStream: Clone + Send + Sync + 'static {
    /// Open a subscription restricted to `filter`
    async fn subscribe(&self, filter: &WatchFilter) -> Result<Subscription, StreamError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
