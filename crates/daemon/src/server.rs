// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;
use std::time::Instant;

use ab_core::{TaskError, TaskHandle};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::lifecycle::DaemonApp;
use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// What connection handlers need from the daemon
#[derive(Clone)]
pub struct ServerContext {
    pub app: Arc<DaemonApp>,
    pub watcher: TaskHandle,
    pub start_time: Instant,
    /// Cancelled when a client requests shutdown
    pub shutdown_requested: CancellationToken,
}

/// Spawn the accept loop as a critical task of the app's supervisor.
///
/// Each connection is served on its own best-effort task.
pub fn spawn(listener: UnixListener, ctx: ServerContext) -> TaskHandle {
    let supervisor = ctx.app.supervisor().clone();
    supervisor.spawn_critical("control-server", move |task| async move {
        task.set_ready(true);
        loop {
            let accepted = tokio::select! {
                biased;
                _ = task.cancelled() => return Ok(()),
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, _)) => {
                    let ctx = ctx.clone();
                    task.supervisor().spawn("connection", move |_| async move {
                        handle_connection(&ctx, stream)
                            .await
                            .map_err(TaskError::failed)
                    });
                }
                Err(e) => error!(error = %e, "error accepting connection"),
            }
        }
    })
}

/// Handle a single client connection
pub async fn handle_connection(ctx: &ServerContext, stream: UnixStream) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            warn!(error = %e, "failed to read request");
            return Err(ServerError::Protocol(e));
        }
    };

    debug!(?request, "received request");
    let response = handle_request(ctx, request).await;
    debug!(?response, "sending response");

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Handle a single request and return a response
async fn handle_request(ctx: &ServerContext, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                info!(client = %version, daemon = PROTOCOL_VERSION, "protocol version mismatch");
            }
            Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            }
        }

        Request::Status => {
            let mut tasks: Vec<_> = ctx
                .app
                .supervisor()
                .tasks()
                .iter()
                .map(|t| t.name().to_string())
                .collect();
            tasks.sort();
            Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                live_tasks: tasks.len(),
                watcher: format!("{:?}", ctx.watcher.state()),
                tasks,
            }
        }

        // The platform redelivers on error, so the reply waits for the handler
        Request::Callback { callback } => match ctx.app.callback(callback).wait().await {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::Shutdown => {
            ctx.shutdown_requested.cancel();
            Response::ShuttingDown
        }
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
