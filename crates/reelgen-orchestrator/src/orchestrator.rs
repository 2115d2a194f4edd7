//! The job state machine.
//!
//! One wake-up = acquire the write lease, re-read the record, act on
//! whatever per-shot state says is left to do, commit, and either continue
//! into the next phase or suspend until the scheduler fires again. All
//! resume state lives in the job record; nothing is carried in memory
//! between wake-ups.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use reelgen_models::{Job, JobPhase};
use reelgen_providers::CredentialStore;
use reelgen_scheduler::Scheduler;
use reelgen_store::{
    JobKey, JobStore, NoopProgress, ProgressEvent, ProgressSink, ProjectStore, WriteLease,
};

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::factory::AdapterFactory;

/// What a phase step decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    /// Keep driving: the job moved to a phase with immediate work.
    Continue,
    /// Stop here: a timer is armed or the job reached a terminal phase.
    Suspend,
}

pub struct Orchestrator {
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) projects: Arc<dyn ProjectStore>,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) adapters: Arc<dyn AdapterFactory>,
    pub(crate) scheduler: Scheduler<JobKey>,
    pub(crate) config: OrchestratorConfig,
    pub(crate) progress: Arc<dyn ProgressSink>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        projects: Arc<dyn ProjectStore>,
        credentials: Arc<dyn CredentialStore>,
        adapters: Arc<dyn AdapterFactory>,
        scheduler: Scheduler<JobKey>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            projects,
            credentials,
            adapters,
            scheduler,
            config,
            progress: Arc::new(NoopProgress),
        }
    }

    /// Announce committed transitions on a progress sink (push layers
    /// subscribe there; polling clients keep reading the job record).
    pub fn with_progress_sink(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Consume scheduler firings, driving each fired job on its own task.
    /// Jobs are independent; the per-job lease keeps writers single.
    pub fn spawn(self: Arc<Self>, mut wakeups: mpsc::UnboundedReceiver<JobKey>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(key) = wakeups.recv().await {
                let orchestrator = Arc::clone(&self);
                tokio::spawn(async move {
                    orchestrator.resume(&key).await;
                });
            }
        })
    }

    /// Entry after plan approval. Identical to a resume; the state machine
    /// derives everything from the persisted record.
    pub async fn start(&self, key: &JobKey) {
        self.resume(key).await;
    }

    /// Re-enter every job not in a terminal phase. Called on process start.
    pub async fn resume_all(&self) -> OrchestratorResult<usize> {
        let keys = self.store.active_jobs().await?;
        let count = keys.len();
        for key in keys {
            self.scheduler.arm_in(key, std::time::Duration::ZERO).await;
        }
        if count > 0 {
            info!(jobs = count, "re-armed non-terminal jobs");
        }
        Ok(count)
    }

    /// Mark a job for cancellation and wake it so the flag is observed.
    /// Returns false if the job does not exist for this owner.
    pub async fn request_cancel(&self, key: &JobKey) -> OrchestratorResult<bool> {
        let Some(job) = self.store.get(&key.owner_id, &key.job_id).await? else {
            return Ok(false);
        };
        if job.phase.is_terminal() {
            return Ok(true);
        }
        self.store.request_cancel(key).await?;
        self.scheduler
            .arm_in(key.clone(), std::time::Duration::ZERO)
            .await;
        Ok(true)
    }

    /// One wake-up. Never panics the caller: lease contention exits
    /// quietly, anything unexpected fails the job with a redacted message.
    pub async fn resume(&self, key: &JobKey) {
        match self.resume_inner(key).await {
            Ok(()) => {}
            Err(e) if e.is_lease_lost() => {
                debug!(job_id = %key.job_id, "write lease lost mid-wake, yielding to holder");
            }
            Err(e) => {
                error!(job_id = %key.job_id, "orchestration failure: {}", e);
                self.fail_redacted(key).await;
            }
        }
    }

    async fn resume_inner(&self, key: &JobKey) -> OrchestratorResult<()> {
        let Some(lease) = self.store.acquire_lease(key, self.config.lease_ttl).await? else {
            // Another worker holds the job; it will rearm as needed.
            debug!(job_id = %key.job_id, "write lease unavailable, skipping wake");
            return Ok(());
        };

        let result = self.drive(&lease).await;
        self.store.release_lease(&lease).await.ok();
        result
    }

    async fn drive(&self, lease: &WriteLease) -> OrchestratorResult<()> {
        let key = &lease.key;
        let Some(mut job) = self.store.get(&key.owner_id, &key.job_id).await? else {
            warn!(job_id = %key.job_id, "woke for unknown job");
            self.scheduler.disarm(key).await;
            return Ok(());
        };

        if job.phase.is_terminal() {
            self.scheduler.disarm(key).await;
            return Ok(());
        }

        if job.cancel_requested || self.store.cancel_requested(key).await? {
            job.cancel_requested = true;
            job.fail("Cancelled");
            self.commit(lease, &job).await?;
            self.scheduler.disarm(key).await;
            info!(job_id = %job.id, "job cancelled");
            return Ok(());
        }

        let project = self
            .projects
            .get(&key.owner_id, &job.project_id)
            .await?
            .ok_or_else(|| OrchestratorError::ProjectMissing(job.project_id.clone()))?;

        loop {
            let outcome = match job.phase {
                JobPhase::Pending => {
                    job.advance_phase(JobPhase::GeneratingImages);
                    self.commit(lease, &job).await?;
                    StepOutcome::Continue
                }
                JobPhase::GeneratingImages => self.run_images(lease, &mut job, &project).await?,
                JobPhase::ImagesComplete => {
                    job.advance_phase(JobPhase::GeneratingVideos);
                    self.commit(lease, &job).await?;
                    StepOutcome::Continue
                }
                JobPhase::GeneratingVideos => self.run_videos(lease, &mut job, &project).await?,
                JobPhase::VideosComplete => self.enter_compile(lease, &mut job).await?,
                JobPhase::Compiling => self.run_compile(lease, &mut job, &project).await?,
                JobPhase::Complete | JobPhase::Failed => StepOutcome::Suspend,
            };
            if outcome == StepOutcome::Suspend {
                break;
            }
        }

        if job.phase.is_terminal() {
            self.scheduler.disarm(key).await;
            info!(
                job_id = %job.id,
                phase = %job.phase,
                progress = job.progress,
                "job reached terminal phase"
            );
        }
        Ok(())
    }

    /// Commit the record under the lease, then announce the transition.
    /// Publishing is best effort and never fails the wake.
    pub(crate) async fn commit(&self, lease: &WriteLease, job: &Job) -> OrchestratorResult<()> {
        self.store.commit(lease, job).await?;
        if let Err(e) = self.progress.publish(&ProgressEvent::for_job(job)).await {
            debug!(job_id = %job.id, "progress publish failed: {}", e);
        }
        Ok(())
    }

    /// Renew the lease between units of work; a failed renewal aborts the
    /// wake through the lease-lost path.
    pub(crate) async fn ensure_lease(&self, lease: &WriteLease) -> OrchestratorResult<()> {
        if self.store.renew_lease(lease, self.config.lease_ttl).await? {
            Ok(())
        } else {
            Err(OrchestratorError::Store(
                reelgen_store::StoreError::lease_lost(lease.key.to_string()),
            ))
        }
    }

    /// Arm the poll timer for this job.
    pub(crate) async fn arm_poll_timer(&self, key: &JobKey) {
        self.scheduler
            .arm_in(key.clone(), self.config.poll_interval)
            .await;
    }

    /// Compile phase entry: skip straight to Complete when no compile
    /// provider is configured; the per-shot clip urls are the deliverable.
    async fn enter_compile(
        &self,
        lease: &WriteLease,
        job: &mut Job,
    ) -> OrchestratorResult<StepOutcome> {
        if !job.compile_enabled {
            job.complete();
            self.commit(lease, job).await?;
            return Ok(StepOutcome::Suspend);
        }
        job.advance_phase(JobPhase::Compiling);
        self.commit(lease, job).await?;
        Ok(StepOutcome::Continue)
    }

    /// Last-resort failure: the orchestrator itself misbehaved. The real
    /// error goes to the log only; the record gets a redacted message.
    async fn fail_redacted(&self, key: &JobKey) {
        let Ok(Some(lease)) = self.store.acquire_lease(key, self.config.lease_ttl).await else {
            return;
        };
        if let Ok(Some(mut job)) = self.store.get(&key.owner_id, &key.job_id).await {
            if !job.phase.is_terminal() {
                job.fail("Internal error");
                self.store.commit(&lease, &job).await.ok();
            }
        }
        self.store.release_lease(&lease).await.ok();
        self.scheduler.disarm(key).await;
    }
}
