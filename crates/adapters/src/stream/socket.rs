// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change stream over a Unix socket
//!
//! The client sends its [`WatchFilter`] as the first frame; the server then
//! streams [`ChangeEvent`] frames, starting with `Init`. Frames use the
//! length-prefixed JSON encoding from [`ab_core::wire`].

use std::path::{Path, PathBuf};

use ab_core::wire::{self, DEFAULT_TIMEOUT};
use ab_core::{ChangeEvent, WatchFilter};
use async_trait::async_trait;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ChangeStream, MemoryChangeFeed, StreamError, Subscription};

/// Client for a change stream served on a Unix socket
#[derive(Clone, Debug)]
pub struct SocketChangeStream {
    path: PathBuf,
}

impl SocketChangeStream {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChangeStream for SocketChangeStream {
    async fn subscribe(&self, filter: &WatchFilter) -> Result<Subscription, StreamError> {
        let stream = UnixStream::connect(&self.path).await.map_err(|e| {
            StreamError::Connection(format!("{}: {}", self.path.display(), e))
        })?;
        let (mut reader, mut writer) = stream.into_split();
        wire::send(&mut writer, filter).await?;

        let (tx, subscription) = Subscription::channel();
        let token = CancellationToken::new();
        let stop = token.clone();
        tokio::spawn(async move {
            // Hold the write half so the server does not see a half-close
            let _writer = writer;
            loop {
                let item = tokio::select! {
                    _ = stop.cancelled() => break,
                    item = wire::recv::<_, ChangeEvent>(&mut reader) => item,
                };
                match item {
                    Ok(event) => {
                        if !tx.send(Ok(event)) {
                            break;
                        }
                    }
                    Err(e) => {
                        tx.send(Err(e.into()));
                        break;
                    }
                }
            }
        });

        Ok(subscription.with_guard(token.drop_guard()))
    }
}

/// Serves a [`MemoryChangeFeed`] to [`SocketChangeStream`] clients
pub struct SocketFeedServer {
    listener: UnixListener,
    feed: MemoryChangeFeed,
}

impl SocketFeedServer {
    /// Bind at `path`, replacing a stale socket file
    pub fn bind(path: impl AsRef<Path>, feed: MemoryChangeFeed) -> std::io::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        Ok(Self { listener, feed })
    }

    /// Accept clients until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            let stream = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        warn!(error = %e, "feed accept failed");
                        continue;
                    }
                },
            };
            let feed = self.feed.clone();
            let cancel = cancel.child_token();
            tokio::spawn(async move {
                if let Err(e) = serve_client(stream, feed, cancel).await {
                    debug!(error = %e, "feed client ended");
                }
            });
        }
    }
}

async fn serve_client(
    stream: UnixStream,
    feed: MemoryChangeFeed,
    cancel: CancellationToken,
) -> Result<(), StreamError> {
    let (mut reader, mut writer) = stream.into_split();
    let filter: WatchFilter = wire::recv_timeout(&mut reader, DEFAULT_TIMEOUT).await?;
    debug!(kinds = filter.kinds.len(), "feed client subscribed");

    let mut subscription = feed.subscribe(&filter).await?;
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            event = subscription.next() => event?,
        };
        wire::send(&mut writer, &event).await?;
    }
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
