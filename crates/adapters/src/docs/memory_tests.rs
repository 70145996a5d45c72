// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[tokio::test]
async fn create_then_conditional_update() {
    let docs = MemoryDocuments::new();
    assert!(docs.get("req-1").await.unwrap().is_none());

    let r1 = docs
        .put("req-1", json!({ "reviews": 0 }), Precondition::Absent)
        .await
        .unwrap();
    assert_eq!(r1, Revision(1));

    let r2 = docs
        .put("req-1", json!({ "reviews": 1 }), Precondition::Revision(r1))
        .await
        .unwrap();
    assert_eq!(r2, Revision(2));

    let doc = docs.get("req-1").await.unwrap().unwrap();
    assert_eq!(doc.value, json!({ "reviews": 1 }));
    assert_eq!(doc.revision, r2);
    assert_eq!(docs.len(), 1);
}

#[tokio::test]
async fn second_create_fails() {
    let docs = MemoryDocuments::new();
    docs.put("req-1", json!(1), Precondition::Absent).await.unwrap();

    let err = docs
        .put("req-1", json!(2), Precondition::Absent)
        .await
        .unwrap_err();
    assert_eq!(err, DocError::AlreadyExists("req-1".into()));
    assert_eq!(docs.get("req-1").await.unwrap().unwrap().value, json!(1));
}

#[tokio::test]
async fn stale_write_is_rejected_without_effect() {
    let docs = MemoryDocuments::new();
    let r1 = docs.put("k", json!("a"), Precondition::Absent).await.unwrap();
    docs.put("k", json!("b"), Precondition::Revision(r1)).await.unwrap();

    let err = docs
        .put("k", json!("stale"), Precondition::Revision(r1))
        .await
        .unwrap_err();
    assert!(matches!(err, DocError::RevisionMismatch { .. }));
    assert_eq!(docs.get("k").await.unwrap().unwrap().value, json!("b"));
}

#[tokio::test]
async fn concurrent_creates_have_one_winner() {
    let docs = MemoryDocuments::new();
    let mut joins = Vec::new();
    for i in 0..16 {
        let docs = docs.clone();
        joins.push(tokio::spawn(async move {
            docs.put("req-1", json!(i), Precondition::Absent).await
        }));
    }

    let mut winners = 0;
    for join in joins {
        if join.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
