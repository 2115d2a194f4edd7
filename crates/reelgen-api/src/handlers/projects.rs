//! Project lifecycle handlers: create, direct, refine, approve, generate.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::extract::ApiJson;

use reelgen_director::{DirectionRequest, Director};
use reelgen_models::{
    AspectRatio, DirectorConstraints, Job, JobId, Plan, Project, ProjectId, ProjectStatus,
    ProviderSelection, MIN_SHOT_SECONDS,
};
use reelgen_providers::{build_text, Capability, CostBreakdown, ProviderBundle, ProviderError};
use reelgen_store::JobKey;

use crate::auth::OwnerId;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiEnvelope;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub concept: String,
    #[serde(default)]
    pub style: Option<String>,
    pub target_duration: f64,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub providers: ProviderSelection,
    #[serde(default)]
    pub constraints: DirectorConstraints,
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct DirectResponse {
    pub plan: Plan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<CostBreakdown>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub job_id: JobId,
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    owner: OwnerId,
    ApiJson(request): ApiJson<CreateProjectRequest>,
) -> ApiResult<Json<ApiEnvelope<Project>>> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("project name must not be empty"));
    }
    if request.concept.trim().is_empty() {
        return Err(ApiError::bad_request("concept must not be empty"));
    }
    if !request.target_duration.is_finite() || request.target_duration < MIN_SHOT_SECONDS {
        return Err(ApiError::bad_request(format!(
            "target duration must be at least {} seconds",
            MIN_SHOT_SECONDS
        )));
    }

    let mut project = Project::new(
        owner.0,
        request.name.trim(),
        request.concept.trim(),
        request.target_duration,
        request.aspect_ratio,
    );
    project.style = request.style.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    project.providers = request.providers;
    project.constraints = request.constraints;

    state.projects.put(&project).await?;
    info!(project_id = %project.id, "created project");
    Ok(Json(ApiEnvelope::ok(project)))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<Project>>> {
    let project = load_project(&state, &owner, &project_id).await?;
    Ok(Json(ApiEnvelope::ok(project)))
}

/// POST /api/projects/:id/direct
pub async fn direct_project(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<DirectResponse>>> {
    let mut project = load_project(&state, &owner, &project_id).await?;

    let director = planning_director(&state, &owner, &project).await?;
    let request = DirectionRequest {
        concept: project.concept.clone(),
        style: project.style.clone(),
        target_duration: project.target_duration,
        aspect_ratio: project.aspect_ratio,
        constraints: project.constraints.clone(),
    };
    let plan = director.direct(&request).await?;

    let cost_estimate = estimate_cost(&state, &owner, &project, &plan).await?;
    project.set_plan(plan.clone());
    state.projects.put(&project).await?;

    Ok(Json(ApiEnvelope::ok(DirectResponse {
        plan,
        cost_estimate,
    })))
}

/// POST /api/projects/:id/refine
pub async fn refine_project(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(project_id): Path<String>,
    ApiJson(request): ApiJson<RefineRequest>,
) -> ApiResult<Json<ApiEnvelope<DirectResponse>>> {
    if request.feedback.trim().is_empty() {
        return Err(ApiError::bad_request("feedback must not be empty"));
    }

    let mut project = load_project(&state, &owner, &project_id).await?;
    let Some(existing) = project.plan.clone() else {
        return Err(ApiError::bad_request("project has no plan to refine"));
    };

    let director = planning_director(&state, &owner, &project).await?;
    let plan = director.refine(&existing, request.feedback.trim()).await?;

    let cost_estimate = estimate_cost(&state, &owner, &project, &plan).await?;
    project.set_plan(plan.clone());
    state.projects.put(&project).await?;

    Ok(Json(ApiEnvelope::ok(DirectResponse {
        plan,
        cost_estimate,
    })))
}

/// POST /api/projects/:id/approve
pub async fn approve_project(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<Project>>> {
    let mut project = load_project(&state, &owner, &project_id).await?;
    if !project.approve() {
        return Err(ApiError::bad_request("project has no plan to approve"));
    }
    state.projects.put(&project).await?;
    info!(project_id = %project.id, "approved plan");
    Ok(Json(ApiEnvelope::ok(project)))
}

/// POST /api/projects/:id/generate
pub async fn generate_project(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<GenerateResponse>>> {
    let mut project = load_project(&state, &owner, &project_id).await?;
    if project.status != ProjectStatus::Approved {
        return Err(ApiError::bad_request("plan must be approved before generating"));
    }
    let Some(plan) = project.plan.clone() else {
        return Err(ApiError::bad_request("project has no plan"));
    };

    let compile_enabled = !project.providers.compile.is_none();
    let job = Job::from_plan(
        project.id.clone(),
        &project.owner_id,
        project.aspect_ratio,
        &plan,
        compile_enabled,
    );
    state.jobs.create(&job).await?;

    project.mark_generating();
    state.projects.put(&project).await?;

    let key = JobKey::for_job(&job);
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.start(&key).await;
    });

    info!(project_id = %project.id, job_id = %job.id, "started generation job");
    Ok(Json(ApiEnvelope::ok(GenerateResponse { job_id: job.id })))
}

async fn load_project(state: &AppState, owner: &OwnerId, project_id: &str) -> ApiResult<Project> {
    state
        .projects
        .get(owner.as_str(), &ProjectId::from_string(project_id))
        .await?
        .ok_or_else(|| ApiError::not_found("project not found"))
}

/// Build the director over the owner's text provider.
async fn planning_director(
    state: &AppState,
    owner: &OwnerId,
    project: &Project,
) -> ApiResult<Director> {
    let credentials = state
        .credentials
        .lookup(owner.as_str(), Capability::Text)
        .await
        .map_err(ApiError::from)?
        .ok_or(ProviderError::MissingCredentials(Capability::Text))
        .map_err(ApiError::from)?;
    let text = build_text(project.providers.text, &credentials).map_err(ApiError::from)?;
    Ok(Director::new(text))
}

/// Upfront cost disclosure. Absent when the owner has not configured every
/// provider the estimate needs yet.
async fn estimate_cost(
    state: &AppState,
    owner: &OwnerId,
    project: &Project,
    plan: &Plan,
) -> ApiResult<Option<CostBreakdown>> {
    match ProviderBundle::resolve(&project.providers, owner.as_str(), state.credentials.as_ref())
        .await
    {
        Ok(bundle) => Ok(Some(bundle.estimate(plan, project.aspect_ratio))),
        Err(ProviderError::MissingCredentials(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
