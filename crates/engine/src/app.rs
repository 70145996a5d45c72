// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator wiring the stream watcher, record store and handlers
//! under one supervisor

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use ab_adapters::{
    AccessAdapter, ChangeStream, DocumentAdapter, Notifier, TracedDocuments, TracedNotifier,
};
use ab_core::{Callback, Supervisor, SupervisorConfig, SupervisorError, TaskHandle, WatchFilter};
use ab_storage::{RecordStore, StoreConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dispatch::dispatch;
use crate::handlers::{AccessRequestHandler, CallbackHandler};
use crate::watcher::{StreamWatcher, WatcherConfig};

/// Resource kind the access bot watches by default
pub const ACCESS_REQUEST_KIND: &str = "access_request";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub filter: WatchFilter,
    pub watcher: WatcherConfig,
    pub store: StoreConfig,
    pub supervisor: SupervisorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            filter: WatchFilter::new([ACCESS_REQUEST_KIND]),
            watcher: WatcherConfig::default(),
            store: StoreConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

/// External collaborators
pub struct AppDeps<S, D, N, A> {
    pub stream: S,
    pub docs: D,
    pub notifier: N,
    pub access: A,
}

pub struct App<S, D, N, A> {
    supervisor: Supervisor,
    stream: S,
    config: AppConfig,
    requests: Arc<AccessRequestHandler<TracedDocuments<D>, TracedNotifier<N>>>,
    callbacks: Arc<CallbackHandler<TracedDocuments<D>, A>>,
    watcher: OnceLock<TaskHandle>,
}

impl<S, D, N, A> App<S, D, N, A>
where
    S: ChangeStream,
    D: DocumentAdapter,
    N: Notifier,
    A: AccessAdapter,
{
    pub fn new(deps: AppDeps<S, D, N, A>, config: AppConfig) -> Self {
        let supervisor = Supervisor::new(config.supervisor.clone());
        Self::with_supervisor(deps, config, supervisor)
    }

    /// Run under an existing supervisor (e.g. a child of the process scope)
    pub fn with_supervisor(
        deps: AppDeps<S, D, N, A>,
        config: AppConfig,
        supervisor: Supervisor,
    ) -> Self {
        let records = RecordStore::new(TracedDocuments::new(deps.docs), config.store.clone());
        // A handler past its timeout has been dropped, so its leases are stale
        let requests = AccessRequestHandler::new(records.clone(), TracedNotifier::new(deps.notifier))
            .with_lease_ttl(config.watcher.handler_timeout);
        let callbacks = CallbackHandler::new(records, deps.access);
        Self {
            supervisor,
            stream: deps.stream,
            config,
            requests: Arc::new(requests),
            callbacks: Arc::new(callbacks),
            watcher: OnceLock::new(),
        }
    }

    /// Spawn the stream watcher. Later calls return the same handle.
    ///
    /// Await [`TaskHandle::wait_ready`] on the result before accepting
    /// callbacks.
    pub fn start(&self) -> TaskHandle {
        self.watcher
            .get_or_init(|| {
                info!(filter = ?self.config.filter, "starting stream watcher");
                StreamWatcher::with_shared_handler(
                    self.stream.clone(),
                    self.config.filter.clone(),
                    Arc::clone(&self.requests),
                    self.config.watcher.clone(),
                )
                .spawn(&self.supervisor)
            })
            .clone()
    }

    /// Handle an inbound platform callback on its own best-effort task
    pub fn callback(&self, callback: Callback) -> TaskHandle {
        let name = format!("callback:{}", callback.request_id);
        dispatch(
            &self.supervisor,
            name,
            Arc::clone(&self.callbacks),
            callback,
            self.config.watcher.handler_timeout,
        )
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn shutdown(&self, timeout: Duration) -> Result<(), SupervisorError> {
        self.supervisor.shutdown(timeout).await
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
