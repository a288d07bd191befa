use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::workflow_dto::{
        CreateWorkflowPayload, ExecuteWorkflowPayload, WorkflowCreation, WorkflowListQuery,
    },
    error::Result,
    middleware::{
        auth::Claims,
        policy::{Action, Resource},
    },
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/workflows",
    params(
        ("mine" = Option<bool>, Query, description = "Only workflows created by the caller")
    ),
    responses(
        (status = 200, description = "Engagement workflows, newest first")
    )
)]
#[axum::debug_handler]
pub async fn list_workflows(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<WorkflowListQuery>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::Read, Resource::Workflows)?;
    let owner = query.mine.then_some(claims.sub.as_str());
    let workflows = state.workflow_service.list_workflows(owner).await?;
    Ok(Json(workflows))
}

#[utoipa::path(
    post,
    path = "/api/workflows",
    request_body = CreateWorkflowPayload,
    responses(
        (status = 201, description = "Workflow created"),
        (status = 400, description = "Invalid payload or unknown template")
    )
)]
#[axum::debug_handler]
pub async fn create_workflow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateWorkflowPayload>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::ManageWorkflows, Resource::Workflows)?;
    payload.validate()?;
    let owner = Some(claims.sub.clone());
    let workflow = match payload.into_creation(owner.clone())? {
        WorkflowCreation::FromTemplate { template, name } => {
            state
                .workflow_service
                .create_from_template(owner, template, name)
                .await?
        }
        WorkflowCreation::Custom(new) => state.workflow_service.create_workflow(new).await?,
    };
    Ok((StatusCode::CREATED, Json(workflow)))
}

#[utoipa::path(
    post,
    path = "/api/workflows/execute",
    request_body = ExecuteWorkflowPayload,
    responses(
        (status = 201, description = "One pending engagement per workflow step"),
        (status = 404, description = "Candidate, workflow or job not found")
    )
)]
#[axum::debug_handler]
pub async fn execute_workflow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ExecuteWorkflowPayload>,
) -> Result<impl IntoResponse> {
    state.authorize(&claims, Action::ExecuteWorkflow, Resource::Candidate(payload.candidate_id))?;
    payload.validate()?;
    let engagements = state
        .workflow_service
        .execute_workflow(payload.candidate_id, payload.workflow_id, payload.job_id)
        .await?;
    Ok((StatusCode::CREATED, Json(engagements)))
}
