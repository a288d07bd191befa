mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use talent_engine::{
    database::MemoryStore,
    error::Error,
    models::{engagement::EngagementStatus, workflow::WorkflowTemplate},
    services::reengagement_service::{Priority, TriggerOutcome},
};
use uuid::Uuid;

use common::{app_state, candidate, engagement, job, position, workflow};

/// A candidate who moved from Acme to Initech three days ago.
fn mover(store: &MemoryStore) -> Uuid {
    let mut moved = candidate("Margaret Hamilton");
    moved.current_company = Some("Initech".into());
    moved.current_title = Some("Senior Backend Engineer".into());
    let id = moved.id;
    store.insert_candidate(moved).unwrap();
    store
        .insert_history(position(id, "Acme", "Backend Engineer", Utc::now() - Duration::days(700)))
        .unwrap();
    store
        .insert_history(position(
            id,
            "Initech",
            "Senior Backend Engineer",
            Utc::now() - Duration::days(3),
        ))
        .unwrap();
    id
}

#[tokio::test]
async fn recently_sent_candidates_respect_the_window() {
    let store = Arc::new(MemoryStore::new());
    let quiet = candidate("Katherine Johnson");
    store.insert_candidate(quiet.clone()).unwrap();
    let sent = engagement(
        quiet.id,
        Uuid::new_v4(),
        EngagementStatus::Sent,
        Utc::now() - Duration::days(10),
    );
    store.insert_engagement(sent.clone()).unwrap();
    let state = app_state(store, Some("unused"));

    let found = state
        .reengagement_service
        .find_re_engagement_candidates(90)
        .await
        .unwrap();
    assert!(found.iter().all(|c| c.candidate_id != quiet.id));

    let found = state
        .reengagement_service
        .find_re_engagement_candidates(5)
        .await
        .unwrap();
    let entry = found
        .iter()
        .find(|c| c.candidate_id == quiet.id)
        .expect("candidate listed with a 5 day window");
    assert_eq!(entry.days_since_last_contact, 10);
    assert_eq!(entry.last_contacted, Some(sent.created_at));
    assert_eq!(entry.priority, Priority::Low);
}

#[tokio::test]
async fn milestones_rank_candidates_first() {
    let store = Arc::new(MemoryStore::new());
    let mover_id = mover(&store);
    let idle = candidate("Frances Allen");
    store.insert_candidate(idle.clone()).unwrap();
    let mut archived = candidate("Dennis Ritchie");
    archived.status = talent_engine::models::candidate::CandidateStatus::Archived;
    store.insert_candidate(archived.clone()).unwrap();
    store.insert_job(job("Senior Rust Engineer", &["Rust"])).unwrap();

    let found = app_state(store, None)
        .reengagement_service
        .find_re_engagement_candidates(90)
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].candidate_id, mover_id);
    assert_eq!(found[0].priority, Priority::High);
    assert!(found[0].reason.contains("COMPANY_CHANGE"));
    assert_eq!(found[0].recommended_jobs.len(), 1);
    // Never contacted, created 400 days ago.
    assert_eq!(found[1].candidate_id, idle.id);
    assert_eq!(found[1].priority, Priority::Medium);
    assert!(found.iter().all(|c| c.candidate_id != archived.id));
}

#[tokio::test]
async fn non_positive_window_is_rejected() {
    let state = app_state(Arc::new(MemoryStore::new()), None);
    let err = state
        .reengagement_service
        .find_re_engagement_candidates(0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn out_of_range_window_is_rejected() {
    let state = app_state(Arc::new(MemoryStore::new()), None);
    for max_days in [200_000_000, i64::MAX] {
        let err = state
            .reengagement_service
            .find_re_engagement_candidates(max_days)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{}", max_days);
    }
}

#[tokio::test]
async fn trigger_schedules_with_the_default_workflow() {
    let store = Arc::new(MemoryStore::new());
    let id = mover(&store);
    let state = app_state(store.clone(), Some("Congrats on the move!"));

    let outcome = state
        .reengagement_service
        .trigger_re_engagement(id, None)
        .await
        .unwrap();
    let TriggerOutcome::Scheduled { engagement, milestone } = outcome else {
        panic!("expected a scheduled engagement");
    };
    assert_eq!(engagement.status, EngagementStatus::Scheduled);
    assert_eq!(engagement.content.as_deref(), Some("Congrats on the move!"));
    assert!(milestone.is_some());

    // The default workflow was created on demand and is reused.
    let workflows = state.workflow_service.list_workflows(None).await.unwrap();
    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0].id, engagement.workflow_id);
}

#[tokio::test]
async fn milestone_is_resolved_by_the_first_trigger() {
    let store = Arc::new(MemoryStore::new());
    let id = mover(&store);
    let state = app_state(store, Some("Hello"));

    let first = state
        .reengagement_service
        .trigger_re_engagement(id, None)
        .await
        .unwrap();
    let TriggerOutcome::Scheduled { engagement, .. } = first else {
        panic!("expected the first trigger to schedule");
    };

    let second = state
        .reengagement_service
        .trigger_re_engagement(id, None)
        .await;
    // The milestone is now older than the last contact.
    assert!(matches!(second, Err(Error::NoEligibleMilestone(_))));

    let engagements = state.engagement_service.list_for_candidate(id).await.unwrap();
    assert_eq!(engagements.len(), 1);
    assert_eq!(engagements[0].id, engagement.id);
}

#[tokio::test]
async fn failed_attempt_leaves_the_milestone_open() {
    let store = Arc::new(MemoryStore::new());
    let id = mover(&store);

    let first = app_state(store.clone(), None)
        .reengagement_service
        .trigger_re_engagement(id, None)
        .await
        .unwrap();
    assert!(matches!(first, TriggerOutcome::Failed { .. }));

    let state = app_state(store, Some("Congrats on the move!"));
    let listed = state
        .reengagement_service
        .find_re_engagement_candidates(90)
        .await
        .unwrap();
    let entry = listed.iter().find(|c| c.candidate_id == id).unwrap();
    assert_eq!(entry.priority, Priority::High);
    assert_eq!(entry.last_contacted, None);

    let retry = state
        .reengagement_service
        .trigger_re_engagement(id, None)
        .await
        .unwrap();
    let TriggerOutcome::Scheduled { milestone, .. } = retry else {
        panic!("expected the retry to schedule, got {:?}", retry);
    };
    assert!(milestone.is_some());

    let engagements = state.engagement_service.list_for_candidate(id).await.unwrap();
    assert_eq!(engagements.len(), 2);
    assert!(engagements.iter().any(|e| e.status == EngagementStatus::Failed));
    assert!(engagements.iter().any(|e| e.status == EngagementStatus::Scheduled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_triggers_create_one_engagement() {
    let store = Arc::new(MemoryStore::new());
    let id = mover(&store);
    let chosen = workflow(WorkflowTemplate::FollowUp);
    let workflow_id = chosen.id;
    store.insert_workflow(chosen).unwrap();
    let state = app_state(store, Some("Hello"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = state.reengagement_service.clone();
            tokio::spawn(async move { service.trigger_re_engagement(id, Some(workflow_id)).await })
        })
        .collect();

    let mut scheduled = Vec::new();
    let mut in_flight = Vec::new();
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            TriggerOutcome::Scheduled { engagement, .. } => scheduled.push(engagement.id),
            TriggerOutcome::InFlight { engagement_id } => in_flight.push(engagement_id),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!(scheduled.len(), 1);
    assert_eq!(in_flight.len(), 7);
    assert!(in_flight.iter().all(|e| *e == scheduled[0]));

    let engagements = state.engagement_service.list_for_candidate(id).await.unwrap();
    assert_eq!(engagements.len(), 1);
    assert_eq!(engagements[0].id, scheduled[0]);
}

#[tokio::test]
async fn out_of_range_step_delay_creates_nothing() {
    let store = Arc::new(MemoryStore::new());
    let id = mover(&store);
    let mut stored = workflow(WorkflowTemplate::FollowUp);
    stored.steps[0].delay_days = u32::MAX;
    store.insert_workflow(stored.clone()).unwrap();
    let state = app_state(store, Some("Hello"));

    let err = state
        .reengagement_service
        .trigger_re_engagement(id, Some(stored.id))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = state
        .workflow_service
        .execute_workflow(id, stored.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let engagements = state.engagement_service.list_for_candidate(id).await.unwrap();
    assert!(engagements.is_empty());
}

#[tokio::test]
async fn explicit_workflow_reports_in_flight_and_cooling_down() {
    let store = Arc::new(MemoryStore::new());
    let busy = candidate("Barbara Liskov");
    let resting = candidate("John Backus");
    let chosen = workflow(WorkflowTemplate::FollowUp);
    store.insert_candidate(busy.clone()).unwrap();
    store.insert_candidate(resting.clone()).unwrap();
    store.insert_workflow(chosen.clone()).unwrap();
    let pending = engagement(busy.id, chosen.id, EngagementStatus::Pending, Utc::now());
    let sent = engagement(
        resting.id,
        chosen.id,
        EngagementStatus::Sent,
        Utc::now() - Duration::days(10),
    );
    store.insert_engagement(pending.clone()).unwrap();
    store.insert_engagement(sent.clone()).unwrap();
    let state = app_state(store, Some("Hello"));

    let outcome = state
        .reengagement_service
        .trigger_re_engagement(busy.id, Some(chosen.id))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        TriggerOutcome::InFlight { engagement_id } if engagement_id == pending.id
    ));

    let outcome = state
        .reengagement_service
        .trigger_re_engagement(resting.id, Some(chosen.id))
        .await
        .unwrap();
    match outcome {
        TriggerOutcome::CoolingDown {
            last_sent_at,
            available_at,
        } => {
            assert_eq!(Some(last_sent_at), sent.sent_at);
            assert_eq!(available_at, last_sent_at + Duration::days(90));
        }
        other => panic!("expected cooling down, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_generation_marks_engagement_failed() {
    let store = Arc::new(MemoryStore::new());
    let id = mover(&store);
    // No text generated.
    let state = app_state(store, None);

    let outcome = state
        .reengagement_service
        .trigger_re_engagement(id, None)
        .await
        .unwrap();
    let TriggerOutcome::Failed { engagement, reason } = outcome else {
        panic!("expected a failed engagement");
    };
    assert_eq!(engagement.status, EngagementStatus::Failed);
    assert_eq!(engagement.failure_reason.as_deref(), Some(reason.as_str()));
    assert!(engagement.sent_at.is_none());
}

#[tokio::test]
async fn candidate_without_milestones_is_not_triggered() {
    let store = Arc::new(MemoryStore::new());
    let steady = candidate("Edsger Dijkstra");
    store.insert_candidate(steady.clone()).unwrap();
    let state = app_state(store, Some("Hello"));

    let err = state
        .reengagement_service
        .trigger_re_engagement(steady.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoEligibleMilestone(id) if id == steady.id));

    let err = state
        .reengagement_service
        .trigger_re_engagement(Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
