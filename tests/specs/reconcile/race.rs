//! A platform callback racing the change stream's first sighting of a request

use crate::prelude::*;

struct Bot {
    feed: MemoryChangeFeed,
    docs: MemoryDocuments,
    notifier: FakeNotifier,
    access: FakeAccessAdapter,
    app: App<MemoryChangeFeed, MemoryDocuments, FakeNotifier, FakeAccessAdapter>,
}

async fn running_bot() -> Bot {
    let feed = MemoryChangeFeed::new();
    let docs = MemoryDocuments::new();
    let notifier = FakeNotifier::new();
    let access = FakeAccessAdapter::new();
    let app = App::new(
        AppDeps {
            stream: feed.clone(),
            docs: docs.clone(),
            notifier: notifier.clone(),
            access: access.clone(),
        },
        AppConfig::default(),
    );
    assert_eq!(app.start().wait_ready().await, Ok(true));
    Bot {
        feed,
        docs,
        notifier,
        access,
        app,
    }
}

#[tokio::test]
async fn callback_before_record_then_retry() {
    let bot = running_bot().await;

    // 1. Callback arrives before the stream has seen the request
    let first = bot.app.callback(approve("r1", "bob")).wait().await;
    assert!(matches!(first, Err(TaskError::Failed(ref m)) if m.contains("not found")));

    // 2. Stream creates the record and opens the ticket
    bot.feed.publish(put_event(&AccessRequest::new("r1", "alice")));
    eventually("ticket", || bot.notifier.tickets_created() == 1).await;
    // 3. Redelivered callback now lands exactly once
    assert_eq!(bot.app.callback(approve("r1", "bob")).wait().await, Ok(()));

    // The ticket id may still be in flight; both writes must survive
    let store: RecordStore<_, RequestRecord> =
        RecordStore::new(bot.docs.clone(), StoreConfig::default());
    let mut record = RequestRecord::new();
    for _ in 0..500 {
        record = store.get("r1").await.unwrap().unwrap().0;
        if record.has_ticket() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    similar_asserts::assert_eq!(
        record,
        RequestRecord {
            ticket_id: "ticket-1".into(),
            reviews: 1,
            ..RequestRecord::new()
        }
    );
    assert_eq!(bot.access.resolution("r1"), Some(Resolution::Approved));

    bot.app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn replayed_stream_does_not_repeat_side_effects() {
    let bot = running_bot().await;
    let request = AccessRequest::new("r1", "alice");

    for _ in 0..5 {
        bot.feed.publish(put_event(&request));
    }
    eventually("ticket", || bot.notifier.tickets_created() == 1).await;

    let resolved = request.with_state(ab_core::RequestState::Denied);
    for _ in 0..5 {
        bot.feed.publish(put_event(&resolved));
    }
    eventually("resolution", || bot.notifier.tickets_resolved() == 1).await;

    // Let stragglers finish, then confirm nothing was repeated
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(bot.notifier.tickets_created(), 1);
    assert_eq!(bot.notifier.tickets_resolved(), 1);

    bot.app.shutdown(Duration::from_secs(5)).await.unwrap();
}
