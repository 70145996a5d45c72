// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control and webhook protocol spoken on the daemon socket
//!
//! One request and one response per connection, each a length-prefixed
//! JSON frame.

use std::path::Path;
use std::time::Duration;

use ab_core::wire::{self, WireError};
use ab_core::Callback;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;

pub use ab_core::wire::{decode, encode, write_message, DEFAULT_TIMEOUT};

/// Protocol version
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request from a client (platform webhook relay or operator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    Hello { version: String },
    Status,
    /// Approve/deny callback from the messaging platform
    Callback { callback: Callback },
    Shutdown,
}

/// Response from the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Hello { version: String },
    Status {
        uptime_secs: u64,
        live_tasks: usize,
        watcher: String,
        /// Names of the live tasks, sorted
        #[serde(default)]
        tasks: Vec<String>,
    },
    /// The callback was applied
    Ok,
    ShuttingDown,
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("request timed out")]
    Timeout,
    #[error("connection closed")]
    ConnectionClosed,
}

impl ProtocolError {
    fn from_wire(err: WireError) -> Self {
        match err {
            WireError::Timeout => ProtocolError::Timeout,
            WireError::ConnectionClosed => ProtocolError::ConnectionClosed,
            other => ProtocolError::Wire(other),
        }
    }
}

pub async fn read_request<R>(reader: &mut R, timeout: Duration) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    wire::recv_timeout(reader, timeout)
        .await
        .map_err(ProtocolError::from_wire)
}

pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    tokio::time::timeout(timeout, wire::send(writer, response))
        .await
        .map_err(|_| ProtocolError::Timeout)?
        .map_err(ProtocolError::from_wire)
}

/// Send one request to the daemon at `socket_path` and wait for its reply
pub async fn call(
    socket_path: impl AsRef<Path>,
    request: &Request,
    timeout: Duration,
) -> Result<Response, ProtocolError> {
    let stream = UnixStream::connect(socket_path.as_ref())
        .await
        .map_err(WireError::from)?;
    let (mut reader, mut writer) = stream.into_split();
    wire::send(&mut writer, request)
        .await
        .map_err(ProtocolError::from_wire)?;
    wire::recv_timeout(&mut reader, timeout)
        .await
        .map_err(ProtocolError::from_wire)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
