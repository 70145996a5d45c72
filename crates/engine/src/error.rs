// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for event and callback handlers

use ab_adapters::{AccessError, NotifyError};
use ab_storage::StoreError;
use thiserror::Error;

use crate::record::Refusal;

/// Errors returned by the access-request and callback handlers
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("change event for {0} carries no payload")]
    MissingPayload(String),
    #[error(transparent)]
    Store(#[from] StoreError<Refusal>),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

impl From<StoreError> for HandleError {
    fn from(err: StoreError) -> Self {
        HandleError::Store(StoreError::widen(err))
    }
}

impl HandleError {
    /// The record the handler needed does not exist (yet)
    pub fn is_not_found(&self) -> bool {
        matches!(self, HandleError::Store(e) if e.is_not_found())
    }
}
