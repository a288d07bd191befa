use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::engagement_dto::TriggerReEngagementPayload,
    error::Result,
    middleware::{
        auth::Claims,
        policy::{Action, Resource},
    },
    services::reengagement_service::TriggerOutcome,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/candidates/{id}/engagements",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Engagements ordered by creation time"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidate_engagements(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::Read, Resource::Candidate(id))?;
    let engagements = state.engagement_service.list_for_candidate(id).await?;
    Ok(Json(engagements))
}

#[utoipa::path(
    get,
    path = "/api/candidates/{id}/milestones",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Career milestones detected as of now"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidate_milestones(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::Read, Resource::Candidate(id))?;
    let milestones = state.reengagement_service.detect_career_milestones(id).await?;
    Ok(Json(milestones))
}

#[utoipa::path(
    get,
    path = "/api/candidates/{id}/matching-jobs",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Best matching active jobs"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_matching_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::Read, Resource::Candidate(id))?;
    let matches = state.matching_service.find_matching_jobs(id).await?;
    Ok(Json(matches))
}

#[utoipa::path(
    post,
    path = "/api/candidates/{id}/re-engage",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 201, description = "Engagement created and scheduled or failed"),
        (status = 200, description = "Candidate is cooling down or already has an engagement in flight"),
        (status = 404, description = "Candidate or workflow not found"),
        (status = 409, description = "No eligible milestone")
    )
)]
#[axum::debug_handler]
pub async fn trigger_re_engagement(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<TriggerReEngagementPayload>>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::TriggerReEngagement, Resource::Candidate(id))?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;

    let outcome = state
        .reengagement_service
        .trigger_re_engagement(id, payload.workflow_id)
        .await?;
    let status = match outcome {
        TriggerOutcome::Scheduled { .. } | TriggerOutcome::Failed { .. } => StatusCode::CREATED,
        TriggerOutcome::CoolingDown { .. } | TriggerOutcome::InFlight { .. } => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}
