// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ab_core::Resolution;
use async_trait::async_trait;

use super::{AccessAdapter, AccessError};

/// Access adapter that logs transitions instead of applying them
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAccessAdapter;

#[async_trait]
impl AccessAdapter for LogAccessAdapter {
    async fn set_state(
        &self,
        request_id: &str,
        resolution: Resolution,
        reviewer: &str,
        reason: Option<&str>,
    ) -> Result<(), AccessError> {
        tracing::info!(request = request_id, %resolution, reviewer, reason, "access request transitioned");
        Ok(())
    }
}
