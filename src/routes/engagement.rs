use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::engagement_dto::{ReEngagementQuery, UpdateEngagementStatusPayload},
    error::Result,
    middleware::{
        auth::Claims,
        policy::{Action, Resource},
    },
    models::engagement::EngagementStatus,
    AppState,
};

#[utoipa::path(
    patch,
    path = "/api/engagements/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Engagement ID")
    ),
    request_body = UpdateEngagementStatusPayload,
    responses(
        (status = 200, description = "Engagement advanced"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Engagement not found"),
        (status = 409, description = "Transition not allowed from the current status")
    )
)]
#[axum::debug_handler]
pub async fn update_engagement_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEngagementStatusPayload>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::AdvanceEngagement, Resource::Engagement(id))?;
    payload.validate()?;
    let target: EngagementStatus = payload.status.parse()?;
    let engagement = state
        .engagement_service
        .advance(id, target, payload.metadata, payload.failure_reason)
        .await?;
    Ok(Json(engagement))
}

#[utoipa::path(
    get,
    path = "/api/re-engagement",
    params(
        ("maxDays" = Option<i64>, Query, description = "Skip candidates sent anything within this many days (default 90)")
    ),
    responses(
        (status = 200, description = "Re-engagement candidates by priority"),
        (status = 400, description = "maxDays is not positive")
    )
)]
#[axum::debug_handler]
pub async fn list_re_engagement_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ReEngagementQuery>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::Read, Resource::CandidatePool)?;
    query.validate()?;
    let candidates = state
        .reengagement_service
        .find_re_engagement_candidates(query.max_days())
        .await?;
    Ok(Json(candidates))
}
