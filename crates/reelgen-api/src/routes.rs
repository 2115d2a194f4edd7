//! API routes.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, jobs, projects};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let project_routes = Router::new()
        .route("/projects", post(projects::create_project))
        .route("/projects/:project_id", get(projects::get_project))
        .route("/projects/:project_id/direct", post(projects::direct_project))
        .route("/projects/:project_id/refine", post(projects::refine_project))
        .route("/projects/:project_id/approve", post(projects::approve_project))
        .route("/projects/:project_id/generate", post(projects::generate_project));

    let job_routes = Router::new()
        .route("/jobs/:job_id", get(jobs::get_job))
        .route("/jobs/:job_id/cancel", post(jobs::cancel_job));

    Router::new()
        .nest("/api", project_routes.merge(job_routes))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
