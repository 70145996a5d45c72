// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform handler shape for stream events and inbound callbacks

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Processes one payload. Invoked once per payload on its own task, bounded
/// by a deadline; `cancel` fires when the owning scope terminates.
#[async_trait]
pub trait Handler<P>: Send + Sync + 'static
where
    P: Send + 'static,
{
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle(&self, cancel: CancellationToken, payload: P) -> Result<(), Self::Error>;
}

/// Handler backed by a closure
pub struct FnHandler<F, P> {
    f: F,
    _payload: PhantomData<fn(P)>,
}

/// Wrap a closure as a [`Handler`]
pub fn handler_fn<F, Fut, P, E>(f: F) -> FnHandler<F, P>
where
    F: Fn(CancellationToken, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    P: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    FnHandler {
        f,
        _payload: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, P, E> Handler<P> for FnHandler<F, P>
where
    F: Fn(CancellationToken, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    P: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    async fn handle(&self, cancel: CancellationToken, payload: P) -> Result<(), E> {
        (self.f)(cancel, payload).await
    }
}
