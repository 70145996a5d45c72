// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory document store

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{DocError, Document, DocumentAdapter, Precondition, Revision};

/// Document store held in process memory.
///
/// The precondition check and the write happen under one lock, so
/// conditional writes are atomic.
#[derive(Clone, Default)]
pub struct MemoryDocuments {
    docs: Arc<Mutex<HashMap<String, Document>>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Synchronous write used by wrappers that need to interleave their own
    /// changes with a caller's
    pub(crate) fn put_now(
        &self,
        key: &str,
        value: serde_json::Value,
        precondition: Precondition,
    ) -> Result<Revision, DocError> {
        let mut docs = self.lock();
        let current = docs.get(key).map(|doc| doc.revision);
        let revision = precondition.check(key, current)?;
        docs.insert(key.to_string(), Document { value, revision });
        Ok(revision)
    }

    pub(crate) fn get_now(&self, key: &str) -> Option<Document> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Document>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentAdapter for MemoryDocuments {
    async fn get(&self, key: &str) -> Result<Option<Document>, DocError> {
        Ok(self.get_now(key))
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        precondition: Precondition,
    ) -> Result<Revision, DocError> {
        self.put_now(key, value, precondition)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
