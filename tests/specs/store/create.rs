//! At most one create succeeds per key

use crate::prelude::*;
use ab_storage::WalDocuments;

async fn race_creates<D: ab_adapters::DocumentAdapter>(docs: D, creators: usize) -> usize {
    let store: RecordStore<D, Tally> = RecordStore::new(docs, StoreConfig::default());
    let tasks: Vec<_> = (0..creators)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let initial = Tally {
                    count: 0,
                    writers: vec![format!("creator-{i}")],
                };
                store.create(&CancellationToken::new(), "r1", initial).await
            })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => winners += 1,
            Err(StoreError::AlreadyExists(key)) => assert_eq!(key, "r1"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    winners
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_creator_wins_in_memory() {
    assert_eq!(race_creates(MemoryDocuments::new(), 32).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_creator_wins_on_wal() {
    let dir = tempfile::tempdir().unwrap();
    let docs = WalDocuments::open(dir.path().join("records.wal")).unwrap();
    assert_eq!(race_creates(docs.clone(), 16).await, 1);
    assert_eq!(docs.len(), 1);
}

#[tokio::test]
async fn winner_value_is_stored() {
    let docs = MemoryDocuments::new();
    let store: RecordStore<_, Tally> = RecordStore::new(docs, StoreConfig::default());
    let cancel = CancellationToken::new();
    let first = Tally {
        count: 7,
        writers: vec!["first".into()],
    };

    store.create(&cancel, "r1", first.clone()).await.unwrap();
    let _ = store.create(&cancel, "r1", Tally::default()).await;

    let (stored, _) = store.get("r1").await.unwrap().unwrap();
    similar_asserts::assert_eq!(stored, first);
}
