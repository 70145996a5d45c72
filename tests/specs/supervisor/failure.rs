//! Critical failures tear the scope down; cancellation never counts as one

use crate::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::test]
async fn critical_error_becomes_terminal_and_cancels_siblings() {
    let sup = Supervisor::default();
    let cancelled = Arc::new(AtomicUsize::new(0));

    for i in 0..3 {
        let cancelled = Arc::clone(&cancelled);
        sup.spawn(format!("worker-{i}"), move |ctx| async move {
            ctx.cancelled().await;
            cancelled.fetch_add(1, Ordering::SeqCst);
            Err(TaskError::Cancelled)
        });
    }
    sup.spawn_critical("listener", |_ctx| async {
        Err(TaskError::Failed("address in use".into()))
    });

    let err = sup.shutdown(Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(&err, SupervisorError::TaskFailed(f) if f.len() == 1));
    assert!(err.to_string().contains("address in use"));
    assert_eq!(cancelled.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn best_effort_error_only_reaches_reporters() {
    let sup = Supervisor::default();
    let reported = Arc::new(AtomicUsize::new(0));
    {
        let reported = Arc::clone(&reported);
        sup.on_failure(move |_| {
            reported.fetch_add(1, Ordering::SeqCst);
        });
    }

    let handle = sup.spawn("handler", |_ctx| async {
        Err(TaskError::Failed("notifier down".into()))
    });
    assert!(handle.wait().await.is_err());

    assert_eq!(reported.load(Ordering::SeqCst), 1);
    assert!(!sup.is_terminated());
    sup.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn cancelled_scope_ends_cleanly() {
    let parent = CancellationToken::new();
    let sup = Supervisor::with_parent(&parent, SupervisorConfig::default());
    sup.spawn_critical("watcher", |ctx| async move {
        ctx.cancelled().await;
        Err(TaskError::Cancelled)
    });

    parent.cancel();
    assert_eq!(sup.wait().await, Ok(()));
    assert_eq!(sup.shutdown(Duration::from_secs(5)).await, Ok(()));
}
