// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change events delivered by a remote change stream

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Operation carried by a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    /// Subscription is established; sent once per connection before any change
    Init,
    Put,
    Delete,
}

/// A single change observed on the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub op: OpType,
    /// Resource kind, e.g. `access_request`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Resource identifier
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ChangeEvent {
    pub fn init() -> Self {
        Self {
            op: OpType::Init,
            kind: String::new(),
            id: String::new(),
            payload: None,
        }
    }

    pub fn put(kind: impl Into<String>, id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            op: OpType::Put,
            kind: kind.into(),
            id: id.into(),
            payload: Some(payload),
        }
    }

    pub fn delete(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            op: OpType::Delete,
            kind: kind.into(),
            id: id.into(),
            payload: None,
        }
    }

    pub fn is_init(&self) -> bool {
        self.op == OpType::Init
    }

    /// Decode the payload into a typed resource. `None` when absent.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.payload
            .as_ref()
            .map(|value| T::deserialize(value))
            .transpose()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
