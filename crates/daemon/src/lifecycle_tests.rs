// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::{call, Request, Response, DEFAULT_TIMEOUT};

fn config_in(dir: &Path, extra: &str) -> Config {
    let text = format!(
        "socket_path = \"{dir}/abd.sock\"\nlock_path = \"{dir}/abd.pid\"\n{extra}",
        dir = dir.display()
    );
    Config::parse(&text).unwrap()
}

#[test]
fn minimal_config_uses_defaults() {
    let config = Config::parse("socket_path = \"/tmp/a.sock\"\nlock_path = \"/tmp/a.pid\"").unwrap();
    assert_eq!(config.stream.backend, StreamKind::Memory);
    assert_eq!(config.store.backend, StoreKind::Memory);
    assert_eq!(config.store.max_attempts, 5);
    assert_eq!(config.shutdown.timeout, Duration::from_secs(15));
    assert!(config.log_path.is_none());

    let app = config.app_config();
    assert!(app.filter.matches_kind("access_request"));
    assert_eq!(app.watcher, WatcherConfig::default());
}

#[test]
fn full_config_parses() {
    let config = Config::parse(
        r#"
socket_path = "/tmp/ab/abd.sock"
lock_path = "/tmp/ab/abd.pid"
log_path = "/tmp/ab/abd.log"

[stream]
backend = "socket"
path = "/run/access/events.sock"
kinds = ["access_request", "role:*"]

[watcher]
init_timeout = "2s"
handler_timeout = "30s"
startup_attempts = 0

[watcher.backoff]
base = "250ms"
max = "1m"
factor = 3

[store]
backend = "wal"
path = "/var/lib/ab/records.wal"
max_attempts = 8

[shutdown]
timeout = "20s"
hook_timeout = "1s"
"#,
    )
    .unwrap();

    assert_eq!(config.stream.backend, StreamKind::Socket);
    assert_eq!(config.watcher.startup_attempts, 0);
    assert_eq!(config.watcher.backoff.max, Duration::from_secs(60));
    assert_eq!(config.watcher.backoff.factor, 3);

    let app = config.app_config();
    assert!(app.filter.matches_kind("role:admin"));
    assert_eq!(app.store.max_attempts, 8);
    assert_eq!(app.supervisor.hook_timeout, Duration::from_secs(1));
}

#[test]
fn backend_paths_are_required() {
    let base = "socket_path = \"/tmp/a.sock\"\nlock_path = \"/tmp/a.pid\"\n";
    for section in ["[stream]\nbackend = \"socket\"", "[store]\nbackend = \"wal\""] {
        let err = Config::parse(&format!("{base}{section}")).unwrap_err();
        assert!(matches!(err, LifecycleError::Invalid(_)), "{section}: {err}");
    }
}

#[test]
fn unknown_keys_are_rejected() {
    let err = Config::parse("socket_path = \"/a\"\nlock_path = \"/b\"\nsokcet = 1").unwrap_err();
    assert!(matches!(err, LifecycleError::Parse(_)));
}

#[tokio::test]
async fn startup_serves_socket_and_shuts_down() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), "");

    let daemon = startup(&config).await.unwrap();
    assert!(config.socket_path.exists());

    let response = call(&config.socket_path, &Request::Ping, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(response, Response::Pong);

    daemon.shutdown().await.unwrap();
    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn second_instance_is_locked_out() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), "");

    let daemon = startup(&config).await.unwrap();
    let err = startup(&config).await.err().unwrap();
    assert!(matches!(err, LifecycleError::LockFailed(_)));

    // The running daemon keeps its files
    assert!(config.socket_path.exists());
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn unreachable_stream_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(
        dir.path(),
        &format!(
            "[stream]\nbackend = \"socket\"\npath = \"{}/missing.sock\"\n\
             [watcher]\nstartup_attempts = 2\n[watcher.backoff]\nbase = \"10ms\"\nmax = \"20ms\"\n",
            dir.path().display()
        ),
    );

    let err = startup(&config).await.err().unwrap();
    assert!(matches!(err, LifecycleError::NotReady(_)), "{err}");
    assert!(err.to_string().contains("2 attempt(s)"));
    assert!(!config.lock_path.exists());
    assert!(!config.socket_path.exists());
}

#[tokio::test]
async fn stream_ending_before_init_closes_the_app() {
    use ab_adapters::{FakeChangeStream, Script};

    let stream = FakeChangeStream::with_scripts([Script::Refuse(StreamError::Cancelled)]);
    let app = App::new(
        AppDeps {
            stream,
            docs: MemoryDocuments::new(),
            notifier: LogNotifier::new(),
            access: LogAccessAdapter,
        },
        AppConfig::default(),
    );
    // Ignores cancellation; only an abort ends it
    let stubborn = app
        .supervisor()
        .spawn("stubborn", |_ctx| std::future::pending::<Result<(), TaskError>>());

    let watcher = app.start();
    let err = await_ready(&app, &watcher).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Cancelled), "{err}");
    assert!(app.supervisor().is_terminated());
    let ended = tokio::time::timeout(Duration::from_secs(5), stubborn.wait()).await;
    assert_eq!(ended, Ok(Err(TaskError::Cancelled)));
}

#[tokio::test]
async fn wal_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let wal = dir.path().join("records.wal");
    let config = config_in(
        dir.path(),
        &format!("[store]\nbackend = \"wal\"\npath = \"{}\"\n", wal.display()),
    );
    let feed = MemoryChangeFeed::new();

    let daemon = startup_with_stream(&config, Some(feed.clone())).await.unwrap();
    let request = ab_core::AccessRequest::new("r1", "alice");
    feed.publish(ab_core::ChangeEvent::put(
        ACCESS_REQUEST_KIND,
        "r1",
        serde_json::to_value(&request).unwrap(),
    ));
    for _ in 0..500 {
        if WalDocuments::open(wal.clone()).unwrap().len() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    daemon.shutdown().await.unwrap();

    assert_eq!(WalDocuments::open(wal).unwrap().len(), 1);
}
