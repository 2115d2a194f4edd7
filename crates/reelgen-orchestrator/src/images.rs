//! Image generation phase.
//!
//! Shots are processed in declared order: start frame, then end frame, each
//! persisted before and after the external call so a resume re-derives
//! exactly the remaining work. A shot that fails permanently is contained;
//! the job goes on with its siblings.

use tracing::{info, warn};

use reelgen_models::{Job, JobPhase, Project, ShotState};
use reelgen_providers::{with_retry, Capability};
use reelgen_store::WriteLease;

use crate::error::OrchestratorResult;
use crate::orchestrator::{Orchestrator, StepOutcome};

impl Orchestrator {
    pub(crate) async fn run_images(
        &self,
        lease: &WriteLease,
        job: &mut Job,
        project: &Project,
    ) -> OrchestratorResult<StepOutcome> {
        let credentials = self
            .credentials
            .lookup(&job.owner_id, Capability::Image)
            .await?;

        let Some(credentials) = credentials else {
            warn!(job_id = %job.id, "owner has no image credentials");
            for shot in job
                .shots
                .iter_mut()
                .filter(|s| !s.is_terminal() && !s.has_images())
            {
                shot.fail("no image synthesis credentials configured");
            }
            return self.finish_images(lease, job).await;
        };

        let adapter = self.adapters.image(project.providers.image, &credentials)?;
        let (width, height) = job.aspect_ratio.dimensions();

        for index in 0..job.shots.len() {
            if job.shots[index].is_terminal() || job.shots[index].has_images() {
                continue;
            }
            self.ensure_lease(lease).await?;

            if job.shots[index].start_image_url.is_none() {
                job.shots[index].state = ShotState::GeneratingStart;
                self.commit(lease, job).await?;

                let prompt = job.shots[index].start_prompt.clone();
                let result = with_retry(&self.config.retry, "image_start_frame", || {
                    adapter.synthesize(&prompt, width, height, None)
                })
                .await;

                match result {
                    Ok(image) => {
                        let shot = &mut job.shots[index];
                        shot.start_image_url = Some(image.url);
                        shot.state = ShotState::GeneratingEnd;
                        job.recompute_progress();
                        self.commit(lease, job).await?;
                    }
                    Err(e) => {
                        warn!(job_id = %job.id, shot = index, "start frame failed: {}", e);
                        job.shots[index].fail(format!("start frame: {}", e));
                        self.commit(lease, job).await?;
                        continue;
                    }
                }
            }

            if job.shots[index].end_image_url.is_none() {
                if job.shots[index].state != ShotState::GeneratingEnd {
                    job.shots[index].state = ShotState::GeneratingEnd;
                    self.commit(lease, job).await?;
                }

                let prompt = job.shots[index].end_prompt.clone();
                let result = with_retry(&self.config.retry, "image_end_frame", || {
                    adapter.synthesize(&prompt, width, height, None)
                })
                .await;

                match result {
                    Ok(image) => {
                        let shot = &mut job.shots[index];
                        shot.end_image_url = Some(image.url);
                        // Both frames ready; the shot waits for the video phase.
                        shot.state = ShotState::Pending;
                        job.recompute_progress();
                        self.commit(lease, job).await?;
                    }
                    Err(e) => {
                        warn!(job_id = %job.id, shot = index, "end frame failed: {}", e);
                        job.shots[index].fail(format!("end frame: {}", e));
                        self.commit(lease, job).await?;
                    }
                }
            }
        }

        self.finish_images(lease, job).await
    }

    /// Aggregate per-shot outcomes: everything failed means the job fails;
    /// any usable shot carries the job into the video phase.
    async fn finish_images(
        &self,
        lease: &WriteLease,
        job: &mut Job,
    ) -> OrchestratorResult<StepOutcome> {
        let usable = job.shots.iter().filter(|s| s.has_images()).count();
        if usable == 0 {
            job.fail("all shots failed during image generation");
            self.commit(lease, job).await?;
            return Ok(StepOutcome::Suspend);
        }

        info!(
            job_id = %job.id,
            usable,
            failed = job.shots.len() - usable,
            "image phase finished"
        );
        job.advance_phase(JobPhase::ImagesComplete);
        self.commit(lease, job).await?;
        Ok(StepOutcome::Continue)
    }
}
