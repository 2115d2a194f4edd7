//! Video generation phase: submit each usable shot to the remote queue,
//! then poll on the scheduler's cadence until every shot is terminal or the
//! tick ceiling is hit.
//!
//! Idempotence hinges on `video_request_handle`: a shot that already has a
//! handle is never resubmitted, so replayed wake-ups cannot duplicate
//! external work.

use tracing::{debug, info, warn};

use reelgen_models::{Job, JobPhase, Project, ShotState};
use reelgen_providers::{with_retry, Capability, RemoteStatus, VideoSubmission, VideoSynthesis};
use reelgen_store::WriteLease;

use crate::error::OrchestratorResult;
use crate::orchestrator::{Orchestrator, StepOutcome};

impl Orchestrator {
    pub(crate) async fn run_videos(
        &self,
        lease: &WriteLease,
        job: &mut Job,
        project: &Project,
    ) -> OrchestratorResult<StepOutcome> {
        let credentials = self
            .credentials
            .lookup(&job.owner_id, Capability::Video)
            .await?;

        let Some(credentials) = credentials else {
            warn!(job_id = %job.id, "owner has no video credentials");
            for shot in job.shots.iter_mut().filter(|s| !s.is_terminal()) {
                shot.fail("no video synthesis credentials configured");
            }
            return self.finish_videos(lease, job).await;
        };

        let adapter = self.adapters.video(project.providers.video, &credentials)?;

        let mut submitted = false;
        for index in 0..job.shots.len() {
            let shot = &job.shots[index];
            if shot.is_terminal() || !shot.has_images() || shot.video_request_handle.is_some() {
                continue;
            }
            self.ensure_lease(lease).await?;

            job.shots[index].state = ShotState::SubmittingVideo;
            self.commit(lease, job).await?;

            let shot = &job.shots[index];
            let submission = VideoSubmission {
                motion_prompt: shot.motion_prompt.clone(),
                start_image_url: shot.start_image_url.clone().unwrap_or_default(),
                end_image_url: if adapter.supports_end_frame() {
                    shot.end_image_url.clone()
                } else {
                    None
                },
                duration: shot.duration,
                aspect_ratio: job.aspect_ratio,
            };

            let result = with_retry(&self.config.retry, "video_submit", || {
                adapter.submit(&submission)
            })
            .await;

            match result {
                Ok(handle) => {
                    let shot = &mut job.shots[index];
                    shot.video_request_handle = Some(handle);
                    shot.state = ShotState::PollingVideo;
                    self.commit(lease, job).await?;
                    submitted = true;
                }
                Err(e) => {
                    warn!(job_id = %job.id, shot = index, "video submit failed: {}", e);
                    job.shots[index].fail(format!("video submit: {}", e));
                    self.commit(lease, job).await?;
                }
            }
        }

        if submitted {
            // Fresh submissions: give the remote queue a tick before the
            // first poll.
            self.arm_poll_timer(&lease.key).await;
            return Ok(StepOutcome::Suspend);
        }

        self.video_poll_tick(lease, job, adapter.as_ref()).await
    }

    /// One poll tick over every in-flight shot.
    async fn video_poll_tick(
        &self,
        lease: &WriteLease,
        job: &mut Job,
        adapter: &dyn VideoSynthesis,
    ) -> OrchestratorResult<StepOutcome> {
        let polling: Vec<usize> = job
            .shots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.state == ShotState::PollingVideo)
            .map(|(i, _)| i)
            .collect();

        if polling.is_empty() {
            return self.finish_videos(lease, job).await;
        }

        // Ceiling check happens before any polling, so the expiring tick
        // issues no further external calls.
        if job.poll_attempts >= self.config.video_poll_ceiling {
            warn!(
                job_id = %job.id,
                attempts = job.poll_attempts,
                "video polling ceiling reached"
            );
            job.fail("Timeout in GeneratingVideos");
            self.commit(lease, job).await?;
            return Ok(StepOutcome::Suspend);
        }

        for index in polling {
            let handle = job.shots[index]
                .video_request_handle
                .clone()
                .unwrap_or_default();

            match adapter.poll(&handle).await {
                Ok(outcome) => match outcome.status {
                    RemoteStatus::Done => match outcome.url {
                        Some(url) => {
                            let shot = &mut job.shots[index];
                            shot.video_url = Some(url);
                            shot.state = ShotState::Complete;
                        }
                        None => {
                            job.shots[index].fail("provider reported done without a clip url");
                        }
                    },
                    RemoteStatus::Failed => {
                        let message = outcome
                            .error
                            .unwrap_or_else(|| "video generation failed".to_string());
                        job.shots[index].fail(message);
                    }
                    RemoteStatus::Queued | RemoteStatus::Running => {}
                },
                Err(e) => {
                    // Transient poll trouble is swallowed; the next tick
                    // tries again.
                    debug!(job_id = %job.id, shot = index, "poll error: {}", e);
                }
            }
        }

        job.poll_attempts += 1;
        job.recompute_progress();

        if job.shots.iter().all(|s| s.is_terminal()) {
            return self.finish_videos(lease, job).await;
        }

        self.commit(lease, job).await?;
        self.arm_poll_timer(&lease.key).await;
        Ok(StepOutcome::Suspend)
    }

    /// Aggregate: at least one clip means the job proceeds; none means it
    /// fails.
    async fn finish_videos(
        &self,
        lease: &WriteLease,
        job: &mut Job,
    ) -> OrchestratorResult<StepOutcome> {
        let completed = job
            .shots
            .iter()
            .filter(|s| s.state == ShotState::Complete)
            .count();

        if completed == 0 {
            job.fail("all shots failed during video generation");
            self.commit(lease, job).await?;
            return Ok(StepOutcome::Suspend);
        }

        info!(
            job_id = %job.id,
            completed,
            failed = job.shots.len() - completed,
            "video phase finished"
        );
        job.recompute_progress();
        job.advance_phase(JobPhase::VideosComplete);
        self.commit(lease, job).await?;
        Ok(StepOutcome::Continue)
    }
}
