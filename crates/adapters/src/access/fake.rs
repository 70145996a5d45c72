// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake access adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ab_core::Resolution;
use async_trait::async_trait;

use super::{AccessAdapter, AccessError};

/// Recorded state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCall {
    pub request_id: String,
    pub resolution: Resolution,
    pub reviewer: String,
    pub reason: Option<String>,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<AccessCall>,
    resolved: HashMap<String, Resolution>,
}

/// Fake access service that refuses to transition a request twice
#[derive(Clone, Default)]
pub struct FakeAccessAdapter {
    state: Arc<Mutex<FakeState>>,
}

impl FakeAccessAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AccessCall> {
        self.lock().calls.clone()
    }

    pub fn resolution(&self, request_id: &str) -> Option<Resolution> {
        self.lock().resolved.get(request_id).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AccessAdapter for FakeAccessAdapter {
    async fn set_state(
        &self,
        request_id: &str,
        resolution: Resolution,
        reviewer: &str,
        reason: Option<&str>,
    ) -> Result<(), AccessError> {
        let mut state = self.lock();
        if state.resolved.contains_key(request_id) {
            return Err(AccessError::AlreadyResolved(request_id.to_string()));
        }
        state.resolved.insert(request_id.to_string(), resolution);
        state.calls.push(AccessCall {
            request_id: request_id.to_string(),
            resolution,
            reviewer: reviewer.to_string(),
            reason: reason.map(str::to_string),
        });
        Ok(())
    }
}
