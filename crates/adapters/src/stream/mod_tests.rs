// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ab_core::wire::WireError;

#[test]
fn transient_errors() {
    assert!(StreamError::Connection("refused".into()).is_transient());
    assert!(StreamError::Closed.is_transient());
    assert!(!StreamError::Cancelled.is_transient());
    assert!(!StreamError::Fatal("bad filter".into()).is_transient());
}

#[test]
fn wire_errors_map_to_stream_errors() {
    assert_eq!(StreamError::from(WireError::ConnectionClosed), StreamError::Closed);
    assert!(StreamError::from(WireError::Timeout).is_transient());

    let json = serde_json::from_str::<ChangeEvent>("{").unwrap_err();
    assert!(matches!(
        StreamError::from(WireError::Json(json)),
        StreamError::Fatal(_)
    ));
}

#[tokio::test]
async fn dropped_sender_reads_as_closed() {
    let (tx, mut sub) = Subscription::channel();
    assert!(tx.send(Ok(ChangeEvent::init())));
    drop(tx);

    assert!(sub.next().await.unwrap().is_init());
    assert_eq!(sub.next().await, Err(StreamError::Closed));
}

#[tokio::test]
async fn dropped_subscription_closes_sender() {
    let (tx, sub) = Subscription::channel();
    drop(sub);
    assert!(tx.is_closed());
    assert!(!tx.send(Ok(ChangeEvent::init())));
}
