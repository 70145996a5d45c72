// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task id allocation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::task::TaskId;

/// Allocates ids for spawned tasks. Ids are never reused within a supervisor.
pub trait IdGen: Send + Sync + 'static {
    fn next_id(&self) -> TaskId;
}

/// Random ids, used by supervisors unless one is supplied
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next_id(&self) -> TaskId {
        TaskId(uuid::Uuid::new_v4().simple().to_string())
    }
}

/// `<prefix>-1`, `<prefix>-2`, ... for deterministic tests and logs.
/// Clones share one counter.
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: Arc<str>,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("task")
    }
}

impl IdGen for SequentialIdGen {
    fn next_id(&self) -> TaskId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        TaskId(format!("{}-{n}", self.prefix))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
