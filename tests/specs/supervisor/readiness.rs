//! Readiness gating: waiting for a watcher never hangs

use crate::prelude::*;
use ab_core::BackoffConfig;
use ab_engine::{StreamWatcher, WatcherConfig};

fn config(startup_attempts: u32) -> WatcherConfig {
    WatcherConfig {
        init_timeout: Duration::from_secs(1),
        handler_timeout: Duration::from_secs(5),
        startup_attempts,
        backoff: BackoffConfig::new(Duration::from_millis(100), Duration::from_secs(2)),
    }
}

fn noop() -> impl ab_core::Handler<ChangeEvent> {
    ab_core::handler_fn(|_cancel: CancellationToken, _event: ChangeEvent| async {
        Ok::<_, std::convert::Infallible>(())
    })
}

#[tokio::test(start_paused = true)]
async fn ready_once_init_arrives() {
    let stream = FakeChangeStream::with_scripts([
        Script::Refuse(StreamError::Connection("refused".into())),
        Script::healthy([]),
    ]);
    let sup = Supervisor::default();
    let watcher = StreamWatcher::new(stream, WatchFilter::default(), noop(), config(3)).spawn(&sup);

    assert_eq!(watcher.wait_ready().await, Ok(true));
    sup.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unreachable_stream_reports_error() {
    let stream = FakeChangeStream::with_scripts(
        (0..5).map(|_| Script::Refuse(StreamError::Connection("refused".into()))),
    );
    let sup = Supervisor::default();
    let watcher = StreamWatcher::new(stream.clone(), WatchFilter::default(), noop(), config(3))
        .spawn(&sup);

    let err = watcher.wait_ready().await.unwrap_err();
    assert!(err.to_string().contains("3 attempt(s)"), "{err}");
    assert_eq!(stream.subscribe_count(), 3);
    assert!(matches!(sup.wait().await, Err(SupervisorError::TaskFailed(_))));
}

#[tokio::test(start_paused = true)]
async fn silent_stream_is_not_ready() {
    // Sessions open but never deliver Init
    let stream = FakeChangeStream::new();
    let sup = Supervisor::default();
    let watcher = StreamWatcher::new(stream, WatchFilter::default(), noop(), config(2)).spawn(&sup);

    assert!(watcher.wait_ready().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_ready_is_not_an_error() {
    let stream = FakeChangeStream::new();
    let sup = Supervisor::default();
    let watcher = StreamWatcher::new(stream, WatchFilter::default(), noop(), config(0)).spawn(&sup);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    sup.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(watcher.wait_ready().await, Ok(false));
}
