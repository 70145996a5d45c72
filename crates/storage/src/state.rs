// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized documents from WAL replay

use std::collections::HashMap;

use ab_adapters::{Document, Revision};

use crate::wal::DocWrite;

/// Latest document per key, built by applying WAL writes in order
#[derive(Debug, Default)]
pub struct DocumentState {
    docs: HashMap<String, Document>,
}

impl DocumentState {
    /// Rebuild from replayed writes
    pub fn from_writes(writes: impl IntoIterator<Item = DocWrite>) -> Self {
        let mut state = Self::default();
        for write in writes {
            state.apply(write);
        }
        state
    }

    /// Apply a committed write. Writes at or below the stored revision are
    /// ignored, so replaying a log twice is harmless.
    pub fn apply(&mut self, write: DocWrite) {
        if self
            .revision(&write.key)
            .is_some_and(|current| current >= write.revision)
        {
            return;
        }
        self.docs.insert(
            write.key,
            Document {
                value: write.value,
                revision: write.revision,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&Document> {
        self.docs.get(key)
    }

    pub fn revision(&self, key: &str) -> Option<Revision> {
        self.docs.get(key).map(|doc| doc.revision)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
