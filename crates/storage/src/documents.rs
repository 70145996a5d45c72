// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable document store backed by a WAL

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ab_adapters::{DocError, Document, DocumentAdapter, Precondition, Revision};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::state::DocumentState;
use crate::wal::{DocWrite, Wal, WalError};

struct Inner {
    wal: Wal,
    state: DocumentState,
}

/// File-backed [`DocumentAdapter`].
///
/// The precondition check, the WAL append and the in-memory apply happen
/// under one lock; a write is acknowledged only after it is synced.
#[derive(Clone)]
pub struct WalDocuments {
    path: PathBuf,
    inner: Arc<Mutex<Inner>>,
}

impl WalDocuments {
    /// Open the log at `path`, replaying existing writes
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WalError> {
        let path = path.into();
        // Opening first cuts off a torn tail that replay would reject
        let wal = Wal::open(&path)?;
        let writes = Wal::replay(&path)?;
        let replayed = writes.len();
        let state = DocumentState::from_writes(writes);
        info!(
            path = %path.display(),
            replayed,
            sequence = wal.sequence(),
            documents = state.len(),
            "document log opened"
        );

        Ok(Self {
            path,
            inner: Arc::new(Mutex::new(Inner { wal, state })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.lock().state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().state.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentAdapter for WalDocuments {
    async fn get(&self, key: &str) -> Result<Option<Document>, DocError> {
        Ok(self.lock().state.get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        precondition: Precondition,
    ) -> Result<Revision, DocError> {
        let mut inner = self.lock();
        let revision = precondition.check(key, inner.state.revision(key))?;
        let write = DocWrite {
            key: key.to_string(),
            revision,
            value,
        };
        let seq = inner
            .wal
            .append(&write)
            .map_err(|e| DocError::Storage(e.to_string()))?;
        debug!(key, revision = revision.0, seq, "document written");
        inner.state.apply(write);
        Ok(revision)
    }
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;
