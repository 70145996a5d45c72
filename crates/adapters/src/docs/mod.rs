// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote document store adapters
//!
//! Documents are JSON values addressed by key. Every successful write
//! assigns the key a new, strictly larger [`Revision`]; writes are
//! conditional on a [`Precondition`] so concurrent writers can detect each
//! other.

mod memory;

pub use memory::MemoryDocuments;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DocCall, FakeDocuments};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-key write counter assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Revision {
    pub fn next(self) -> Self {
        Revision(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A stored value with the revision that wrote it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub value: serde_json::Value,
    pub revision: Revision,
}

/// Condition a write must satisfy to commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// No document may exist under the key
    Absent,
    /// The stored document must still be at this revision
    Revision(Revision),
}

impl Precondition {
    /// Check against the key's current revision and return the revision the
    /// write will be assigned
    pub fn check(self, key: &str, current: Option<Revision>) -> Result<Revision, DocError> {
        match (self, current) {
            (Precondition::Absent, None) => Ok(Revision(1)),
            (Precondition::Absent, Some(_)) => Err(DocError::AlreadyExists(key.to_string())),
            (Precondition::Revision(expected), Some(actual)) if expected == actual => {
                Ok(actual.next())
            }
            (Precondition::Revision(expected), actual) => Err(DocError::RevisionMismatch {
                key: key.to_string(),
                expected,
                actual,
            }),
        }
    }
}

/// Errors from document operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocError {
    #[error("document already exists: {0}")]
    AlreadyExists(String),
    #[error("revision mismatch on {key}: expected {expected}, found {}", fmt_revision(.actual))]
    RevisionMismatch {
        key: String,
        expected: Revision,
        actual: Option<Revision>,
    },
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

fn fmt_revision(revision: &Option<Revision>) -> String {
    match revision {
        Some(r) => r.to_string(),
        None => "none".to_string(),
    }
}

/// Adapter for a remote document store with conditional writes
#[async_trait]
pub trait DocumentAdapter: Clone + Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Document>, DocError>;

    /// Write `value` if `precondition` holds, returning the new revision
    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        precondition: Precondition,
    ) -> Result<Revision, DocError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
