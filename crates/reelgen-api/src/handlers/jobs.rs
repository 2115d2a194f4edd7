//! Job status and cancellation handlers.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use reelgen_models::{Job, JobId, JobPhase, ShotState};
use reelgen_store::JobKey;

use crate::auth::OwnerId;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiEnvelope;
use crate::state::AppState;

/// Per-shot summary in a job snapshot.
#[derive(Debug, Serialize)]
pub struct ShotSummary {
    pub scene_id: u32,
    pub shot_index: u32,
    pub status: ShotState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read-only job snapshot for polling clients.
#[derive(Debug, Serialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub project_id: String,
    pub phase: JobPhase,
    pub progress: u8,
    pub shots: Vec<ShotSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_artifact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobSnapshot {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            project_id: job.project_id.to_string(),
            phase: job.phase,
            progress: job.progress,
            shots: job
                .shots
                .into_iter()
                .map(|shot| ShotSummary {
                    scene_id: shot.scene_id,
                    shot_index: shot.shot_index,
                    status: shot.state,
                    video_url: shot.video_url,
                    error: shot.error_message,
                })
                .collect(),
            final_artifact_url: job.final_artifact_url,
            error_message: job.error_message,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancel_requested: bool,
}

/// GET /api/jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<JobSnapshot>>> {
    let job = state
        .jobs
        .get(owner.as_str(), &JobId::from_string(job_id))
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    Ok(Json(ApiEnvelope::ok(JobSnapshot::from(job))))
}

/// POST /api/jobs/:id/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<CancelResponse>>> {
    let key = JobKey::new(owner.as_str(), JobId::from_string(job_id));
    let known = state.orchestrator.request_cancel(&key).await?;
    if !known {
        return Err(ApiError::not_found("job not found"));
    }
    Ok(Json(ApiEnvelope::ok(CancelResponse {
        cancel_requested: true,
    })))
}
