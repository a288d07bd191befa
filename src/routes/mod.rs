pub mod candidate;
pub mod engagement;
pub mod health;
pub mod matching;
pub mod workflow;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::require_bearer_auth,
    cors::cors_layer,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

/// Full application router. Everything under `/api` needs a bearer token.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/candidates/:id/engagements",
            get(candidate::get_candidate_engagements),
        )
        .route(
            "/api/candidates/:id/milestones",
            get(candidate::get_candidate_milestones),
        )
        .route(
            "/api/candidates/:id/matching-jobs",
            get(candidate::get_matching_jobs),
        )
        .route(
            "/api/candidates/:id/re-engage",
            post(candidate::trigger_re_engagement),
        )
        .route(
            "/api/engagements/:id/status",
            patch(engagement::update_engagement_status),
        )
        .route(
            "/api/re-engagement",
            get(engagement::list_re_engagement_candidates),
        )
        .route(
            "/api/workflows",
            get(workflow::list_workflows).post(workflow::create_workflow),
        )
        .route("/api/workflows/execute", post(workflow::execute_workflow))
        .route(
            "/api/matching/candidates/:id",
            post(matching::match_candidate_to_jobs),
        )
        .route(
            "/api/jobs/:id/matching-candidates",
            get(matching::rank_candidates_for_job),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(state.config.api_rps),
            rps_middleware,
        ));

    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
