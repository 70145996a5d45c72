// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake document store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{DocError, Document, DocumentAdapter, MemoryDocuments, Precondition, Revision};

/// Recorded document operation
#[derive(Debug, Clone, PartialEq)]
pub enum DocCall {
    Get { key: String },
    Put { key: String, precondition: Precondition },
}

type Interleave = Box<dyn FnOnce(&serde_json::Value) -> serde_json::Value + Send>;

#[derive(Default)]
struct FakeState {
    calls: Vec<DocCall>,
    /// Writes applied by a simulated concurrent writer just before the next
    /// conditional put on the key
    interleaved: Vec<(String, Interleave)>,
    /// Errors returned instead of performing the next operations
    failures: VecDeque<DocError>,
}

/// Document store backed by [`MemoryDocuments`] that records calls and can
/// inject racing writers and failures
#[derive(Clone, Default)]
pub struct FakeDocuments {
    docs: MemoryDocuments,
    state: Arc<Mutex<FakeState>>,
}

impl FakeDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Before the next `put` on `key` with a revision precondition, rewrite
    /// the stored value with `write`, as if another writer committed first
    pub fn interleave_write(
        &self,
        key: impl Into<String>,
        write: impl FnOnce(&serde_json::Value) -> serde_json::Value + Send + 'static,
    ) {
        self.lock().interleaved.push((key.into(), Box::new(write)));
    }

    /// Fail the next operation with `error`
    pub fn fail_next(&self, error: DocError) {
        self.lock().failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<DocCall> {
        self.lock().calls.clone()
    }

    pub fn put_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, DocCall::Put { .. }))
            .count()
    }

    /// Current stored document, bypassing call recording
    pub fn peek(&self, key: &str) -> Option<Document> {
        self.docs.get_now(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentAdapter for FakeDocuments {
    async fn get(&self, key: &str) -> Result<Option<Document>, DocError> {
        {
            let mut state = self.lock();
            state.calls.push(DocCall::Get {
                key: key.to_string(),
            });
            if let Some(error) = state.failures.pop_front() {
                return Err(error);
            }
        }
        Ok(self.docs.get_now(key))
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        precondition: Precondition,
    ) -> Result<Revision, DocError> {
        let interleave = {
            let mut state = self.lock();
            state.calls.push(DocCall::Put {
                key: key.to_string(),
                precondition,
            });
            if let Some(error) = state.failures.pop_front() {
                return Err(error);
            }
            match precondition {
                Precondition::Revision(_) => state
                    .interleaved
                    .iter()
                    .position(|(k, _)| k == key)
                    .map(|i| state.interleaved.remove(i).1),
                Precondition::Absent => None,
            }
        };

        if let Some(write) = interleave {
            if let Some(current) = self.docs.get_now(key) {
                let next = write(&current.value);
                self.docs
                    .put_now(key, next, Precondition::Revision(current.revision))?;
            }
        }

        self.docs.put_now(key, value, precondition)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
