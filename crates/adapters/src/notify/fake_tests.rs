// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_notifier_records_calls() {
    let notifier = FakeNotifier::new();
    let request = AccessRequest::new("req-1", "alice");

    let ticket = notifier.create_ticket(&request).await.unwrap();
    assert_eq!(ticket, "ticket-1");

    let review = Review {
        author: "bob".into(),
        approve: true,
        reason: None,
    };
    notifier.post_review(&ticket, &review).await.unwrap();
    notifier
        .resolve_ticket(&ticket, Resolution::Approved)
        .await
        .unwrap();

    assert_eq!(
        notifier.calls(),
        vec![
            NotifyCall::CreateTicket {
                request_id: "req-1".into(),
                ticket_id: "ticket-1".into()
            },
            NotifyCall::PostReview {
                ticket_id: "ticket-1".into(),
                author: "bob".into()
            },
            NotifyCall::ResolveTicket {
                ticket_id: "ticket-1".into(),
                resolution: Resolution::Approved
            },
        ]
    );
    assert_eq!(notifier.tickets_created(), 1);
    assert_eq!(notifier.reviews_posted(), 1);
    assert_eq!(notifier.tickets_resolved(), 1);
}

#[tokio::test]
async fn injected_failure_is_not_recorded() {
    let notifier = FakeNotifier::new();
    notifier.fail_next(NotifyError::Failed("rate limited".into()));

    let request = AccessRequest::new("req-1", "alice");
    assert!(notifier.create_ticket(&request).await.is_err());
    assert_eq!(notifier.create_ticket(&request).await.unwrap(), "ticket-1");
    assert_eq!(notifier.tickets_created(), 1);
}
