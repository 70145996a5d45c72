// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[tokio::test]
async fn records_calls() {
    let docs = FakeDocuments::new();
    docs.get("req-1").await.unwrap();
    docs.put("req-1", json!({}), Precondition::Absent).await.unwrap();

    assert_eq!(
        docs.calls(),
        vec![
            DocCall::Get {
                key: "req-1".into()
            },
            DocCall::Put {
                key: "req-1".into(),
                precondition: Precondition::Absent
            },
        ]
    );
    assert_eq!(docs.put_count(), 1);
}

#[tokio::test]
async fn interleaved_write_makes_put_stale() {
    let docs = FakeDocuments::new();
    let r1 = docs
        .put("req-1", json!({ "reviews": 0 }), Precondition::Absent)
        .await
        .unwrap();
    docs.interleave_write("req-1", |_| json!({ "reviews": 5 }));

    let err = docs
        .put("req-1", json!({ "reviews": 1 }), Precondition::Revision(r1))
        .await
        .unwrap_err();
    assert!(matches!(err, DocError::RevisionMismatch { .. }));

    let doc = docs.peek("req-1").unwrap();
    assert_eq!(doc.value, json!({ "reviews": 5 }));
    assert_eq!(doc.revision, Revision(2));
}

#[tokio::test]
async fn injected_failure_is_returned_once() {
    let docs = FakeDocuments::new();
    docs.fail_next(DocError::Unavailable("down".into()));

    assert_eq!(
        docs.get("k").await,
        Err(DocError::Unavailable("down".into()))
    );
    assert_eq!(docs.get("k").await, Ok(None));
}
