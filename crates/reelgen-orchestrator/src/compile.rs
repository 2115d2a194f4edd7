//! Compile phase: stitch the per-shot clips into the final artifact.
//!
//! The request id is persisted before the first poll tick, so a resumed job
//! polls the existing compilation instead of submitting a second one.

use tracing::{debug, info, warn};

use reelgen_models::{Job, Project};
use reelgen_providers::{with_retry, Capability, CompileOptions, RemoteStatus};
use reelgen_store::WriteLease;

use crate::error::OrchestratorResult;
use crate::orchestrator::{Orchestrator, StepOutcome};

impl Orchestrator {
    pub(crate) async fn run_compile(
        &self,
        lease: &WriteLease,
        job: &mut Job,
        project: &Project,
    ) -> OrchestratorResult<StepOutcome> {
        let credentials = self
            .credentials
            .lookup(&job.owner_id, Capability::Compile)
            .await?;

        let Some(credentials) = credentials else {
            warn!(job_id = %job.id, "owner has no compile credentials");
            job.fail("no compilation credentials configured");
            self.commit(lease, job).await?;
            return Ok(StepOutcome::Suspend);
        };

        let Some(adapter) = self
            .adapters
            .compile(project.providers.compile, &credentials)?
        else {
            // Selection says no compiler after all; the clips stand alone.
            job.complete();
            self.commit(lease, job).await?;
            return Ok(StepOutcome::Suspend);
        };

        if job.compile_request_id.is_none() {
            let clips = job.clip_urls();
            let aspect_ratio = job.aspect_ratio;
            let options = CompileOptions::default();
            info!(job_id = %job.id, clips = clips.len(), "submitting compilation");

            let result = with_retry(&self.config.retry, "compile_submit", || {
                adapter.submit(&clips, aspect_ratio, &options)
            })
            .await;

            match result {
                Ok(handle) => {
                    job.compile_request_id = Some(handle);
                    self.commit(lease, job).await?;
                    self.arm_poll_timer(&lease.key).await;
                    return Ok(StepOutcome::Suspend);
                }
                Err(e) => {
                    warn!(job_id = %job.id, "compile submit failed: {}", e);
                    job.fail(format!("compile submit: {}", e));
                    self.commit(lease, job).await?;
                    return Ok(StepOutcome::Suspend);
                }
            }
        }

        // Poll tick. The ceiling check precedes the call, like the video
        // phase.
        if job.compile_poll_attempts >= self.config.compile_poll_ceiling {
            warn!(
                job_id = %job.id,
                attempts = job.compile_poll_attempts,
                "compile polling ceiling reached"
            );
            job.fail("Timeout in Compiling");
            self.commit(lease, job).await?;
            return Ok(StepOutcome::Suspend);
        }

        let handle = job.compile_request_id.clone().unwrap_or_default();
        match adapter.poll(&handle).await {
            Ok(outcome) => match outcome.status {
                RemoteStatus::Done => match outcome.url {
                    Some(url) => {
                        job.final_artifact_url = Some(url);
                        job.complete();
                        self.commit(lease, job).await?;
                        Ok(StepOutcome::Suspend)
                    }
                    None => {
                        job.fail("compiler reported done without an artifact url");
                        self.commit(lease, job).await?;
                        Ok(StepOutcome::Suspend)
                    }
                },
                RemoteStatus::Failed => {
                    let message = outcome
                        .error
                        .unwrap_or_else(|| "compilation failed".to_string());
                    job.fail(format!("compile: {}", message));
                    self.commit(lease, job).await?;
                    Ok(StepOutcome::Suspend)
                }
                RemoteStatus::Queued | RemoteStatus::Running => {
                    job.compile_poll_attempts += 1;
                    self.commit(lease, job).await?;
                    self.arm_poll_timer(&lease.key).await;
                    Ok(StepOutcome::Suspend)
                }
            },
            Err(e) => {
                // Transient poll trouble: swallow and rearm.
                debug!(job_id = %job.id, "compile poll error: {}", e);
                job.compile_poll_attempts += 1;
                self.commit(lease, job).await?;
                self.arm_poll_timer(&lease.key).await;
                Ok(StepOutcome::Suspend)
            }
        }
    }
}
