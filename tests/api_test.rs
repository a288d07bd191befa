mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use talent_engine::{
    database::MemoryStore, middleware::auth::Claims, models::engagement::EngagementStatus, routes,
};
use tower::ServiceExt;
use uuid::Uuid;

use common::{app_state, app_state_with, candidate, engagement, test_config, JWT_SECRET};

fn token(role: &str) -> String {
    let claims = Claims {
        sub: format!("{}-user", role),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        role: Some(role.to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    role: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_is_public() {
    let app = routes::router(app_state(Arc::new(MemoryStore::new()), None));
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_a_valid_bearer_token() {
    let app = routes::router(app_state(Arc::new(MemoryStore::new()), None));
    let (status, body) = send(&app, Method::GET, "/api/re-engagement", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let request = Request::builder()
        .uri("/api/re-engagement")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_gate_each_action() {
    let store = Arc::new(MemoryStore::new());
    let dev = candidate("Radia Perlman");
    store.insert_candidate(dev.clone()).unwrap();
    let app = routes::router(app_state(store, Some("Hello")));
    let uri = format!("/api/candidates/{}/re-engage", dev.id);

    let (status, body) = send(&app, Method::POST, &uri, Some("hr"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/workflows",
        Some("viewer"),
        Some(json!({ "template": "followUp" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Recruiters get through to the service, which finds nothing to act on.
    let (status, body) = send(&app, Method::POST, &uri, Some("recruiter"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "no_eligible_milestone");
}

#[tokio::test]
async fn engagement_status_is_advanced_over_http() {
    let store = Arc::new(MemoryStore::new());
    let dev = candidate("Donald Knuth");
    let scheduled = engagement(dev.id, Uuid::new_v4(), EngagementStatus::Scheduled, Utc::now());
    store.insert_candidate(dev.clone()).unwrap();
    store.insert_engagement(scheduled.clone()).unwrap();
    let app = routes::router(app_state(store, None));
    let uri = format!("/api/engagements/{}/status", scheduled.id);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some("hr"),
        Some(json!({ "status": "SENT", "failure_reason": "not a failure" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some("hr"),
        Some(json!({ "status": "sent", "metadata": { "provider_message_id": "m-1" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SENT");
    assert_eq!(body["metadata"]["provider_message_id"], "m-1");
    assert!(body["sent_at"].is_string());

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some("hr"),
        Some(json!({ "status": "SCHEDULED" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some("hr"),
        Some(json!({ "status": "ARCHIVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/candidates/{}/engagements", dev.id),
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn re_engagement_listing_validates_max_days() {
    let store = Arc::new(MemoryStore::new());
    store.insert_candidate(candidate("Barbara Liskov")).unwrap();
    let app = routes::router(app_state(store, None));

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/re-engagement?maxDays=0",
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/re-engagement?maxDays=200000000",
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/re-engagement?maxDays=30",
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["priority"], "medium");
}

#[tokio::test]
async fn workflows_are_created_and_executed() {
    let store = Arc::new(MemoryStore::new());
    let dev = candidate("Bjarne Stroustrup");
    store.insert_candidate(dev.clone()).unwrap();
    let app = routes::router(app_state(store, None));

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/workflows",
        Some("recruiter"),
        Some(json!({ "template": "initialOutreach" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let steps = created["steps"].as_array().map(Vec::len).unwrap_or_default();
    assert!(steps > 0);

    let (status, mine) = send(
        &app,
        Method::GET,
        "/api/workflows?mine=true",
        Some("recruiter"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().map(Vec::len), Some(1));

    let (status, engagements) = send(
        &app,
        Method::POST,
        "/api/workflows/execute",
        Some("recruiter"),
        Some(json!({ "candidate_id": dev.id, "workflow_id": created["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let engagements = engagements.as_array().cloned().unwrap_or_default();
    assert_eq!(engagements.len(), steps);
    assert!(engagements.iter().all(|e| e["status"] == "PENDING"));
    assert!(engagements.iter().all(|e| e["origin"] == "WORKFLOW"));
}

#[tokio::test]
async fn api_requests_beyond_the_rate_are_rejected() {
    let mut config = test_config();
    config.api_rps = 1;
    let app = routes::router(app_state_with(config, Arc::new(MemoryStore::new()), None));

    let (status, _) = send(&app, Method::GET, "/api/workflows", Some("viewer"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/workflows", Some("viewer"), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "rate_limited");

    // The limiter only guards the API.
    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
