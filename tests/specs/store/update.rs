//! Update never loses a concurrent writer's effect and never commits
//! against a stale base

use crate::prelude::*;
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_all_land() {
    let store: RecordStore<_, Tally> = RecordStore::new(
        MemoryDocuments::new(),
        StoreConfig {
            max_attempts: u32::MAX,
        },
    );
    let cancel = CancellationToken::new();
    store.create(&cancel, "r1", Tally::default()).await.unwrap();

    let tasks: Vec<_> = (0..24)
        .map(|i| {
            let store = store.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                store
                    .update(&cancel, "r1", |mut t: Tally| {
                        t.count += 1;
                        t.writers.push(format!("w{i}"));
                        Ok::<_, std::convert::Infallible>(t)
                    })
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let (tally, revision) = store.get("r1").await.unwrap().unwrap();
    assert_eq!(tally.count, 24);
    let mut writers = tally.writers;
    writers.sort();
    writers.dedup();
    assert_eq!(writers.len(), 24);
    assert_eq!(revision.0, 25);
}

#[tokio::test]
async fn interleaved_writer_is_preserved() {
    let docs = FakeDocuments::new();
    let store: RecordStore<_, Tally> = RecordStore::new(docs.clone(), StoreConfig::default());
    let cancel = CancellationToken::new();
    store.create(&cancel, "r1", Tally::default()).await.unwrap();

    docs.interleave_write("r1", |_| json!({ "count": 10, "writers": ["other"] }));

    let result = store
        .update(&cancel, "r1", |mut t: Tally| {
            t.count += 1;
            t.writers.push("me".into());
            Ok::<_, std::convert::Infallible>(t)
        })
        .await
        .unwrap();

    similar_asserts::assert_eq!(
        result,
        Tally {
            count: 11,
            writers: vec!["other".into(), "me".into()],
        }
    );
}

#[tokio::test]
async fn exhausted_budget_is_a_conflict() {
    let docs = FakeDocuments::new();
    let store: RecordStore<_, Tally> =
        RecordStore::new(docs.clone(), StoreConfig { max_attempts: 2 });
    let cancel = CancellationToken::new();
    store.create(&cancel, "r1", Tally::default()).await.unwrap();

    for n in 0..2 {
        docs.interleave_write("r1", move |_| json!({ "count": 100 + n, "writers": [] }));
    }

    let err = store
        .update(&cancel, "r1", |t: Tally| Ok::<_, std::convert::Infallible>(t))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { attempts: 2, .. }));

    // Nothing was committed on a stale base
    let (tally, _) = store.get("r1").await.unwrap().unwrap();
    assert_eq!(tally.count, 101);
}
