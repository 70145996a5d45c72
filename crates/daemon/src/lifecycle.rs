// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ab_adapters::{
    AccessAdapter, ChangeStream, DocError, Document, DocumentAdapter, LogAccessAdapter,
    LogNotifier, MemoryChangeFeed, MemoryDocuments, Notifier, Precondition, Revision,
    SocketChangeStream, StreamError, Subscription,
};
use ab_core::{KindPattern, SupervisorConfig, SupervisorError, TaskError, TaskHandle, WatchFilter};
use ab_engine::{App, AppConfig, AppDeps, WatcherConfig, ACCESS_REQUEST_KIND};
use ab_storage::{StoreConfig, WalDocuments, WalError};
use async_trait::async_trait;
use fs2::FileExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::server;

/// The access bot as the daemon runs it
pub type DaemonApp = App<StreamBackend, DocBackend, LogNotifier, LogAccessAdapter>;

/// Daemon configuration, loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Inbound webhook/control socket
    pub socket_path: PathBuf,
    /// Single-instance lock (holds the PID)
    pub lock_path: PathBuf,
    /// Log file; stderr when unset
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub stream: StreamSection,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub shutdown: ShutdownSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Socket,
    #[default]
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamSection {
    pub backend: StreamKind,
    /// Event feed socket for `backend = "socket"`
    pub path: Option<PathBuf>,
    pub kinds: Vec<KindPattern>,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            backend: StreamKind::Memory,
            path: None,
            kinds: vec![KindPattern::new(ACCESS_REQUEST_KIND)],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Wal,
    #[default]
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub backend: StoreKind,
    /// WAL file for `backend = "wal"`
    pub path: Option<PathBuf>,
    pub max_attempts: u32,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreKind::Memory,
            path: None,
            max_attempts: StoreConfig::default().max_attempts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownSection {
    /// Budget for draining tasks before they are aborted
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub hook_timeout: Duration,
}

impl Default for ShutdownSection {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            hook_timeout: SupervisorConfig::default().hook_timeout,
        }
    }
}

impl Config {
    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LifecycleError::ConfigRead(path.to_path_buf(), e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, LifecycleError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), LifecycleError> {
        if self.stream.backend == StreamKind::Socket && self.stream.path.is_none() {
            return Err(LifecycleError::Invalid(
                "stream.path is required for the socket backend".into(),
            ));
        }
        if self.store.backend == StoreKind::Wal && self.store.path.is_none() {
            return Err(LifecycleError::Invalid(
                "store.path is required for the wal backend".into(),
            ));
        }
        if self.stream.kinds.is_empty() {
            return Err(LifecycleError::Invalid("stream.kinds must not be empty".into()));
        }
        Ok(())
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            filter: WatchFilter::new(self.stream.kinds.iter().map(|k| k.as_str().to_string())),
            watcher: self.watcher.clone(),
            store: StoreConfig {
                max_attempts: self.store.max_attempts,
            },
            supervisor: SupervisorConfig {
                hook_timeout: self.shutdown.hook_timeout,
            },
        }
    }
}

/// Change stream selected by configuration
#[derive(Clone)]
pub enum StreamBackend {
    Socket(SocketChangeStream),
    Memory(MemoryChangeFeed),
}

#[async_trait]
impl ChangeStream for StreamBackend {
    async fn subscribe(&self, filter: &WatchFilter) -> Result<Subscription, StreamError> {
        match self {
            StreamBackend::Socket(stream) => stream.subscribe(filter).await,
            StreamBackend::Memory(feed) => feed.subscribe(filter).await,
        }
    }
}

/// Document store selected by configuration
#[derive(Clone)]
pub enum DocBackend {
    Wal(WalDocuments),
    Memory(MemoryDocuments),
}

#[async_trait]
impl DocumentAdapter for DocBackend {
    async fn get(&self, key: &str) -> Result<Option<Document>, DocError> {
        match self {
            DocBackend::Wal(docs) => docs.get(key).await,
            DocBackend::Memory(docs) => docs.get(key).await,
        }
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        precondition: Precondition,
    ) -> Result<Revision, DocError> {
        match self {
            DocBackend::Wal(docs) => docs.put(key, value, precondition).await,
            DocBackend::Memory(docs) => docs.put(key, value, precondition).await,
        }
    }
}

/// Daemon state during operation
pub struct Daemon {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub app: Arc<DaemonApp>,
    pub watcher: TaskHandle,
    pub server: TaskHandle,
    /// Cancelled when a client asks the daemon to stop
    pub shutdown_requested: CancellationToken,
    pub start_time: Instant,
}

impl Daemon {
    /// Drain the app within the configured budget, then remove files
    pub async fn shutdown(&self) -> Result<(), SupervisorError> {
        info!("shutting down daemon");
        let result = self.app.shutdown(self.config.shutdown.timeout).await;
        remove_file_logged(&self.config.lock_path, "lock");
        info!("daemon shutdown complete");
        result
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to read config {0}: {1}")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, #[source] std::io::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("change stream never became ready: {0}")]
    NotReady(TaskError),

    #[error("cancelled during startup")]
    Cancelled,
}

/// Start the daemon: lock, open the store, start the watcher, then accept
/// connections once the watcher is ready.
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    startup_with_stream(config, None).await
}

/// As [`startup`], feeding a memory backend from `feed` instead of a fresh one
pub async fn startup_with_stream(
    config: &Config,
    feed: Option<MemoryChangeFeed>,
) -> Result<Daemon, LifecycleError> {
    match startup_inner(config, feed).await {
        Ok(daemon) => Ok(daemon),
        // Files belong to the daemon holding the lock
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

async fn startup_inner(
    config: &Config,
    feed: Option<MemoryChangeFeed>,
) -> Result<Daemon, LifecycleError> {
    // 1. Lock first - prevents two daemons sharing one socket and WAL
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Not truncated until locked: the PID may belong to a running daemon
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    {
        use std::io::Write;
        writeln!(lock_file, "{}", std::process::id())?;
    }

    // 2. Backends
    let docs = match (&config.store.backend, &config.store.path) {
        (StoreKind::Wal, Some(path)) => {
            let docs = WalDocuments::open(path.clone())?;
            info!(path = %path.display(), records = docs.len(), "loaded record store");
            DocBackend::Wal(docs)
        }
        _ => DocBackend::Memory(MemoryDocuments::new()),
    };
    let stream = match (&config.stream.backend, &config.stream.path) {
        (StreamKind::Socket, Some(path)) => StreamBackend::Socket(SocketChangeStream::new(path.clone())),
        _ => StreamBackend::Memory(feed.unwrap_or_default()),
    };

    let app = Arc::new(App::new(
        AppDeps {
            stream,
            docs,
            notifier: LogNotifier::new(),
            access: LogAccessAdapter,
        },
        config.app_config(),
    ));

    // 3. Watcher must be ready before callbacks are accepted
    let watcher = app.start();
    await_ready(&app, &watcher).await?;

    // 4. Bind socket LAST - only after everything else is up
    let listener = match bind_socket(&config.socket_path) {
        Ok(listener) => listener,
        Err(e) => {
            app.supervisor().close();
            return Err(e);
        }
    };

    {
        let socket_path = config.socket_path.clone();
        app.supervisor().on_terminate("remove-socket", move || async move {
            remove_file_logged(&socket_path, "socket");
        });
    }

    let start_time = Instant::now();
    let shutdown_requested = CancellationToken::new();
    let server = server::spawn(
        listener,
        server::ServerContext {
            app: Arc::clone(&app),
            watcher: watcher.clone(),
            start_time,
            shutdown_requested: shutdown_requested.clone(),
        },
    );

    info!(socket = %config.socket_path.display(), "daemon started");

    Ok(Daemon {
        config: config.clone(),
        lock_file,
        app,
        watcher,
        server,
        shutdown_requested,
        start_time,
    })
}

/// Wait for the watcher's first `Init`. Anything else closes the app.
pub(crate) async fn await_ready<S, D, N, A>(
    app: &App<S, D, N, A>,
    watcher: &TaskHandle,
) -> Result<(), LifecycleError>
where
    S: ChangeStream,
    D: DocumentAdapter,
    N: Notifier,
    A: AccessAdapter,
{
    let err = match watcher.wait_ready().await {
        Ok(true) => return Ok(()),
        Ok(false) => LifecycleError::Cancelled,
        Err(e) => LifecycleError::NotReady(e),
    };
    app.supervisor().close();
    Err(err)
}

fn bind_socket(path: &Path) -> Result<UnixListener, LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    UnixListener::bind(path).map_err(|e| LifecycleError::BindFailed(path.to_path_buf(), e))
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

fn remove_file_logged(path: &Path, what: &str) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove {what} file");
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
