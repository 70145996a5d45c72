// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ab_core::{handler_fn, CancellationToken};

#[derive(Debug, thiserror::Error)]
#[error("handler rejected {0}")]
struct Rejected(u32);

#[tokio::test]
async fn success_and_failure_outcomes() {
    let sup = Supervisor::default();
    let handler = Arc::new(handler_fn(|_cancel: CancellationToken, n: u32| async move {
        if n % 2 == 0 {
            Ok(())
        } else {
            Err(Rejected(n))
        }
    }));

    let ok = dispatch(&sup, "even", Arc::clone(&handler), 2, Duration::from_secs(1));
    let failed = dispatch(&sup, "odd", handler, 3, Duration::from_secs(1));

    assert_eq!(ok.wait().await, Ok(()));
    assert_eq!(
        failed.wait().await,
        Err(TaskError::Failed("handler rejected 3".into()))
    );
    assert!(!sup.is_terminated());
}

#[tokio::test(start_paused = true)]
async fn slow_handler_times_out() {
    let sup = Supervisor::default();
    let handler = Arc::new(handler_fn(|_cancel: CancellationToken, _: ()| async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok::<_, Rejected>(())
    }));

    let handle = dispatch(&sup, "slow", handler, (), Duration::from_millis(250));
    assert_eq!(
        handle.wait().await,
        Err(TaskError::TimedOut(Duration::from_millis(250)))
    );
}

#[tokio::test]
async fn error_after_cancel_is_cancellation() {
    let sup = Supervisor::default();
    let handler = Arc::new(handler_fn(|cancel: CancellationToken, _: ()| async move {
        cancel.cancelled().await;
        Err(Rejected(0))
    }));

    let handle = dispatch(&sup, "interrupted", handler, (), Duration::from_secs(5));
    tokio::task::yield_now().await;
    sup.shutdown(Duration::from_secs(1)).await.unwrap();

    assert_eq!(handle.wait().await, Err(TaskError::Cancelled));
}
