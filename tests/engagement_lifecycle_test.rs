mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use talent_engine::{
    database::MemoryStore,
    error::Error,
    models::engagement::{EngagementMetadata, EngagementStatus},
    services::engagement_service::EngagementService,
};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use common::{candidate, engagement};

#[tokio::test]
async fn engagement_moves_forward_and_stamps_timestamps() {
    let store = Arc::new(MemoryStore::new());
    let ada = candidate("Ada Lovelace");
    let pending = engagement(ada.id, Uuid::new_v4(), EngagementStatus::Pending, Utc::now());
    store.insert_candidate(ada.clone()).unwrap();
    store.insert_engagement(pending.clone()).unwrap();
    let service = EngagementService::new(store);

    let scheduled = assert_ok!(
        service
            .advance(pending.id, EngagementStatus::Scheduled, None, None)
            .await
    );
    assert!(scheduled.sent_at.is_none());

    let metadata = EngagementMetadata {
        provider_message_id: Some("msg-42".into()),
        ..Default::default()
    };
    let sent = assert_ok!(
        service
            .advance(pending.id, EngagementStatus::Sent, Some(metadata), None)
            .await
    );
    assert!(sent.sent_at.is_some());
    assert_eq!(sent.metadata.provider_message_id.as_deref(), Some("msg-42"));

    // Skipping DELIVERED is allowed, only direction matters.
    let opened = assert_ok!(
        service
            .advance(pending.id, EngagementStatus::Opened, None, None)
            .await
    );
    assert!(opened.opened_at.is_some());
    assert!(opened.delivered_at.is_none());
    assert_eq!(opened.sent_at, sent.sent_at);

    let responded = assert_ok!(
        service
            .advance(pending.id, EngagementStatus::Responded, None, None)
            .await
    );
    assert!(responded.responded_at.is_some());

    let history = service.list_for_candidate(ada.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, EngagementStatus::Responded);
}

#[tokio::test]
async fn backward_and_terminal_transitions_are_rejected() {
    let store = Arc::new(MemoryStore::new());
    let grace = candidate("Grace Hopper");
    let sent = engagement(grace.id, Uuid::new_v4(), EngagementStatus::Sent, Utc::now());
    store.insert_candidate(grace).unwrap();
    store.insert_engagement(sent.clone()).unwrap();
    let service = EngagementService::new(store);

    let err = assert_err!(
        service
            .advance(sent.id, EngagementStatus::Scheduled, None, None)
            .await
    );
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: EngagementStatus::Sent,
            to: EngagementStatus::Scheduled
        }
    ));

    let err = assert_err!(service.advance(sent.id, EngagementStatus::Sent, None, None).await);
    assert!(matches!(err, Error::InvalidTransition { .. }));

    let failed = assert_ok!(
        service
            .advance(
                sent.id,
                EngagementStatus::Failed,
                None,
                Some("mailbox bounced".into())
            )
            .await
    );
    assert_eq!(failed.failure_reason.as_deref(), Some("mailbox bounced"));

    let err = assert_err!(
        service
            .advance(sent.id, EngagementStatus::Cancelled, None, None)
            .await
    );
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: EngagementStatus::Failed,
            ..
        }
    ));
}

#[tokio::test]
async fn failure_reason_needs_a_failing_target() {
    let store = Arc::new(MemoryStore::new());
    let alan = candidate("Alan Turing");
    let scheduled = engagement(alan.id, Uuid::new_v4(), EngagementStatus::Scheduled, Utc::now());
    store.insert_candidate(alan.clone()).unwrap();
    store.insert_engagement(scheduled.clone()).unwrap();
    let service = EngagementService::new(store);

    let err = assert_err!(
        service
            .advance(
                scheduled.id,
                EngagementStatus::Sent,
                None,
                Some("should not stick".into())
            )
            .await
    );
    assert!(matches!(err, Error::Validation(_)));

    let unchanged = service.list_for_candidate(alan.id).await.unwrap();
    assert_eq!(unchanged[0].status, EngagementStatus::Scheduled);
    assert!(unchanged[0].failure_reason.is_none());

    let cancelled = assert_ok!(
        service
            .advance(
                scheduled.id,
                EngagementStatus::Cancelled,
                None,
                Some("role filled".into())
            )
            .await
    );
    assert_eq!(cancelled.failure_reason.as_deref(), Some("role filled"));
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let service = EngagementService::new(Arc::new(MemoryStore::new()));

    let err = assert_err!(
        service
            .advance(Uuid::new_v4(), EngagementStatus::Sent, None, None)
            .await
    );
    assert!(matches!(err, Error::NotFound(_)));

    let err = assert_err!(service.list_for_candidate(Uuid::new_v4()).await);
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn engagements_are_listed_oldest_first() {
    let store = Arc::new(MemoryStore::new());
    let alan = candidate("Alan Turing");
    let workflow_id = Uuid::new_v4();
    let newer = engagement(alan.id, workflow_id, EngagementStatus::Sent, Utc::now() - Duration::days(1));
    let older = engagement(alan.id, workflow_id, EngagementStatus::Opened, Utc::now() - Duration::days(20));
    store.insert_candidate(alan.clone()).unwrap();
    store.insert_engagement(newer.clone()).unwrap();
    store.insert_engagement(older.clone()).unwrap();

    let listed = EngagementService::new(store)
        .list_for_candidate(alan.id)
        .await
        .unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![older.id, newer.id]);
}
