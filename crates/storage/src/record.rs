// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compare-and-swap record store
//!
//! Records are typed values stored as JSON documents. `create` commits only
//! when no document exists. `update` reads the current value, applies a
//! transform and writes conditionally on the revision it read; on a lost
//! race it re-reads and re-applies the transform from scratch.

use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;

use ab_adapters::{DocError, DocumentAdapter, Precondition, Revision};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Record store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Read-transform-write attempts before `update` gives up with `Conflict`
    pub max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// Errors from record operations. `E` is the transform's refusal type.
#[derive(Debug, Error)]
pub enum StoreError<E = Infallible> {
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    #[error("record not found: {0}")]
    NotFound(String),
    /// The transform rejected the current value
    #[error("update refused: {0}")]
    Refused(E),
    #[error("conflicting writers on {key}: gave up after {attempts} attempt(s)")]
    Conflict { key: String, attempts: u32 },
    #[error("operation cancelled")]
    Cancelled,
    #[error("document store error: {0}")]
    Backend(DocError),
    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl<E> StoreError<E> {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Re-type an error that cannot be `Refused`
    pub fn widen(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(k) => StoreError::AlreadyExists(k),
            StoreError::NotFound(k) => StoreError::NotFound(k),
            StoreError::Refused(never) => match never {},
            StoreError::Conflict { key, attempts } => StoreError::Conflict { key, attempts },
            StoreError::Cancelled => StoreError::Cancelled,
            StoreError::Backend(e) => StoreError::Backend(e),
            StoreError::Codec(e) => StoreError::Codec(e),
        }
    }
}

/// Typed CAS access to per-key records held in a [`DocumentAdapter`]
pub struct RecordStore<D, T> {
    docs: D,
    config: StoreConfig,
    _record: PhantomData<fn() -> T>,
}

impl<D: Clone, T> Clone for RecordStore<D, T> {
    fn clone(&self) -> Self {
        Self {
            docs: self.docs.clone(),
            config: self.config.clone(),
            _record: PhantomData,
        }
    }
}

impl<D, T> fmt::Debug for RecordStore<D, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<D, T> RecordStore<D, T>
where
    D: DocumentAdapter,
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(docs: D, config: StoreConfig) -> Self {
        Self {
            docs,
            config,
            _record: PhantomData,
        }
    }

    pub fn docs(&self) -> &D {
        &self.docs
    }

    /// Read a record and the revision it is at
    pub async fn get(&self, key: &str) -> Result<Option<(T, Revision)>, StoreError> {
        let Some(doc) = self.docs.get(key).await.map_err(StoreError::Backend)? else {
            return Ok(None);
        };
        let record = serde_json::from_value(doc.value)?;
        Ok(Some((record, doc.revision)))
    }

    /// Store `initial` under `key` if no record exists yet.
    ///
    /// Of any number of concurrent creators for one key, exactly one succeeds;
    /// the others get [`StoreError::AlreadyExists`].
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        key: &str,
        initial: T,
    ) -> Result<T, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let value = serde_json::to_value(&initial)?;
        match self.docs.put(key, value, Precondition::Absent).await {
            Ok(revision) => {
                debug!(key, revision = revision.0, "record created");
                Ok(initial)
            }
            Err(DocError::AlreadyExists(_)) => Err(StoreError::AlreadyExists(key.to_string())),
            Err(e) => Err(StoreError::Backend(e)),
        }
    }

    /// Apply `transform` to the record under `key` and commit the result.
    ///
    /// The transform may run several times, each time on a freshly read
    /// value; only its last successful application is committed. Returning
    /// `Err` from it aborts the update with [`StoreError::Refused`].
    pub async fn update<F, E>(
        &self,
        cancel: &CancellationToken,
        key: &str,
        mut transform: F,
    ) -> Result<T, StoreError<E>>
    where
        F: FnMut(T) -> Result<T, E> + Send,
    {
        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let doc = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StoreError::Cancelled),
                doc = self.docs.get(key) => doc.map_err(StoreError::Backend)?,
            };
            let Some(doc) = doc else {
                return Err(StoreError::NotFound(key.to_string()));
            };

            let current: T = serde_json::from_value(doc.value)?;
            let next = transform(current).map_err(StoreError::Refused)?;
            let value = serde_json::to_value(&next)?;

            if cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            match self
                .docs
                .put(key, value, Precondition::Revision(doc.revision))
                .await
            {
                Ok(revision) => {
                    debug!(key, revision = revision.0, attempt, "record updated");
                    return Ok(next);
                }
                Err(DocError::RevisionMismatch { .. }) => {
                    debug!(key, attempt, read = doc.revision.0, "lost update race; retrying");
                }
                Err(e) => return Err(StoreError::Backend(e)),
            }
        }

        warn!(key, attempts = max_attempts, "update retry budget exhausted");
        Err(StoreError::Conflict {
            key: key.to_string(),
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
