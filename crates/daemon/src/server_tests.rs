// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::lifecycle::{DocBackend, StreamBackend};
use crate::protocol::call;
use ab_adapters::{LogAccessAdapter, LogNotifier, MemoryChangeFeed, MemoryDocuments};
use ab_core::{AccessRequest, Callback, CallbackAction, ChangeEvent};
use ab_engine::{App, AppConfig, AppDeps, ACCESS_REQUEST_KIND};
use std::path::PathBuf;
use std::time::Duration;

struct Fixture {
    _dir: tempfile::TempDir,
    socket: PathBuf,
    feed: MemoryChangeFeed,
    ctx: ServerContext,
}

async fn serve() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("abd.sock");
    let feed = MemoryChangeFeed::new();
    let app = Arc::new(App::new(
        AppDeps {
            stream: StreamBackend::Memory(feed.clone()),
            docs: DocBackend::Memory(MemoryDocuments::new()),
            notifier: LogNotifier::new(),
            access: LogAccessAdapter,
        },
        AppConfig::default(),
    ));
    let watcher = app.start();
    watcher.wait_ready().await.unwrap();

    let ctx = ServerContext {
        app,
        watcher,
        start_time: Instant::now(),
        shutdown_requested: CancellationToken::new(),
    };
    let listener = UnixListener::bind(&socket).unwrap();
    spawn(listener, ctx.clone()).wait_ready().await.unwrap();

    Fixture {
        _dir: dir,
        socket,
        feed,
        ctx,
    }
}

async fn request(f: &Fixture, request: Request) -> Response {
    call(&f.socket, &request, DEFAULT_TIMEOUT).await.unwrap()
}

fn approve(id: &str) -> Request {
    Request::Callback {
        callback: Callback {
            request_id: id.to_string(),
            action: CallbackAction::Approve,
            reviewer: "bob".to_string(),
            reason: None,
        },
    }
}

#[tokio::test]
async fn hello_reports_daemon_version() {
    let f = serve().await;
    let response = request(
        &f,
        Request::Hello {
            version: "0.0.0".to_string(),
        },
    )
    .await;
    assert_eq!(
        response,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[tokio::test]
async fn status_reports_ready_watcher() {
    let f = serve().await;
    match request(&f, Request::Status).await {
        Response::Status {
            watcher,
            live_tasks,
            tasks,
            ..
        } => {
            assert_eq!(watcher, "Ready");
            // watcher, accept loop and this connection
            assert!(live_tasks >= 2, "live_tasks = {live_tasks}");
            assert_eq!(live_tasks, tasks.len());
            assert!(tasks.iter().any(|t| t == "stream-watcher"), "tasks = {tasks:?}");
            assert!(tasks.iter().any(|t| t == "control-server"), "tasks = {tasks:?}");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn callback_waits_for_the_handler() {
    let f = serve().await;

    match request(&f, approve("r1")).await {
        Response::Error { message } => assert!(message.contains("not found"), "{message}"),
        other => panic!("unexpected response: {other:?}"),
    }

    f.feed.publish(ChangeEvent::put(
        ACCESS_REQUEST_KIND,
        "r1",
        serde_json::to_value(AccessRequest::new("r1", "alice")).unwrap(),
    ));

    // Redeliver until the stream side has created the record
    let mut response = request(&f, approve("r1")).await;
    for _ in 0..100 {
        if response == Response::Ok {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        response = request(&f, approve("r1")).await;
    }
    assert_eq!(response, Response::Ok);
}

#[tokio::test]
async fn shutdown_request_is_signalled() {
    let f = serve().await;
    assert_eq!(request(&f, Request::Shutdown).await, Response::ShuttingDown);
    assert!(f.ctx.shutdown_requested.is_cancelled());

    f.ctx.app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn silent_client_does_not_stop_the_server() {
    let f = serve().await;
    let _idle = UnixStream::connect(&f.socket).await.unwrap();
    assert_eq!(request(&f, Request::Ping).await, Response::Pong);
}
