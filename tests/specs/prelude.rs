//! Shared helpers for specs

pub use std::sync::Arc;
pub use std::time::Duration;

pub use ab_adapters::{
    FakeAccessAdapter, FakeChangeStream, FakeDocuments, FakeNotifier, MemoryChangeFeed,
    MemoryDocuments, Script, StreamError,
};
pub use ab_core::{
    AccessRequest, Callback, CallbackAction, CancellationToken, ChangeEvent, Resolution,
    Supervisor, SupervisorConfig, SupervisorError, TaskError, WatchFilter,
};
pub use ab_engine::{App, AppConfig, AppDeps, RequestRecord, ACCESS_REQUEST_KIND};
pub use ab_storage::{RecordStore, StoreConfig, StoreError};
pub use serde::{Deserialize, Serialize};

/// Test record for store specs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub count: u32,
    pub writers: Vec<String>,
}

pub fn put_event(request: &AccessRequest) -> ChangeEvent {
    ChangeEvent::put(
        ACCESS_REQUEST_KIND,
        &request.id,
        serde_json::to_value(request).unwrap(),
    )
}

pub fn approve(request_id: &str, reviewer: &str) -> Callback {
    Callback {
        request_id: request_id.to_string(),
        action: CallbackAction::Approve,
        reviewer: reviewer.to_string(),
        reason: None,
    }
}

/// Poll `check` until it holds, failing after ~5s
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
