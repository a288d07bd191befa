use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::matching_dto::{CandidateRankingQuery, MatchJobsPayload},
    error::Result,
    middleware::{
        auth::Claims,
        policy::{Action, Resource},
    },
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/matching/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    request_body = MatchJobsPayload,
    responses(
        (status = 200, description = "Given jobs ranked for the candidate"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn match_candidate_to_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MatchJobsPayload>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::Read, Resource::Candidate(id))?;
    payload.validate()?;
    let matches = state
        .matching_service
        .match_candidate_to_jobs(id, &payload.job_ids)
        .await?;
    Ok(Json(matches))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}/matching-candidates",
    params(
        ("id" = Uuid, Path, description = "Job ID"),
        ("limit" = Option<usize>, Query, description = "Maximum candidates returned (default 20)")
    ),
    responses(
        (status = 200, description = "Active candidates ranked for the job"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn rank_candidates_for_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<CandidateRankingQuery>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::Read, Resource::Job(id))?;
    query.validate()?;
    let ranked = state
        .matching_service
        .rank_candidates_for_job(id, query.limit())
        .await?;
    Ok(Json(ranked))
}
