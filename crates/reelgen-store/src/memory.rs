//! In-memory store for tests and single-process deployments.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use reelgen_models::{Job, JobId, Project, ProjectId};

use crate::error::{StoreError, StoreResult};
use crate::job_store::{JobKey, JobStore, WriteLease};
use crate::project_store::ProjectStore;

#[derive(Debug, Clone)]
struct LeaseEntry {
    holder: String,
    expires_at: Instant,
}

/// Map-backed implementation of both stores, mirroring the Redis layout.
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<HashMap<String, Job>>,
    projects: Mutex<HashMap<String, Project>>,
    leases: Mutex<HashMap<String, LeaseEntry>>,
    cancels: Mutex<std::collections::HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn job_key(owner_id: &str, job_id: &JobId) -> String {
        format!("{}:{}", owner_id, job_id)
    }

    fn project_key(owner_id: &str, project_id: &ProjectId) -> String {
        format!("{}:{}", owner_id, project_id)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, job: &Job) -> StoreResult<()> {
        let key = Self::job_key(&job.owner_id, &job.id);
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&key) {
            return Err(StoreError::already_exists(key));
        }
        jobs.insert(key, job.clone());
        Ok(())
    }

    async fn get(&self, owner_id: &str, job_id: &JobId) -> StoreResult<Option<Job>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.get(&Self::job_key(owner_id, job_id)).cloned())
    }

    async fn acquire_lease(&self, key: &JobKey, ttl: Duration) -> StoreResult<Option<WriteLease>> {
        let map_key = key.to_string();
        let mut leases = self.leases.lock().await;
        let now = Instant::now();

        if let Some(existing) = leases.get(&map_key) {
            if existing.expires_at > now {
                return Ok(None);
            }
        }

        let holder = Uuid::new_v4().to_string();
        leases.insert(
            map_key,
            LeaseEntry {
                holder: holder.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(Some(WriteLease {
            key: key.clone(),
            holder,
        }))
    }

    async fn renew_lease(&self, lease: &WriteLease, ttl: Duration) -> StoreResult<bool> {
        let mut leases = self.leases.lock().await;
        let now = Instant::now();
        match leases.get_mut(&lease.key.to_string()) {
            Some(entry) if entry.holder == lease.holder && entry.expires_at > now => {
                entry.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_lease(&self, lease: &WriteLease) -> StoreResult<()> {
        let mut leases = self.leases.lock().await;
        let map_key = lease.key.to_string();
        if let Some(entry) = leases.get(&map_key) {
            if entry.holder == lease.holder {
                leases.remove(&map_key);
            }
        }
        Ok(())
    }

    async fn commit(&self, lease: &WriteLease, job: &Job) -> StoreResult<()> {
        let map_key = lease.key.to_string();

        // Hold the lease lock across the write so the holder check and the
        // record replacement are one atomic step, like the Redis script.
        let leases = self.leases.lock().await;
        let valid = leases
            .get(&map_key)
            .map(|entry| entry.holder == lease.holder && entry.expires_at > Instant::now())
            .unwrap_or(false);
        if !valid {
            return Err(StoreError::lease_lost(map_key));
        }

        let mut jobs = self.jobs.lock().await;
        jobs.insert(map_key, job.clone());
        Ok(())
    }

    async fn active_jobs(&self) -> StoreResult<Vec<JobKey>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .values()
            .filter(|job| !job.phase.is_terminal())
            .map(JobKey::for_job)
            .collect())
    }

    async fn request_cancel(&self, key: &JobKey) -> StoreResult<()> {
        self.cancels.lock().await.insert(key.to_string());
        Ok(())
    }

    async fn cancel_requested(&self, key: &JobKey) -> StoreResult<bool> {
        Ok(self.cancels.lock().await.contains(&key.to_string()))
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn put(&self, project: &Project) -> StoreResult<()> {
        let key = Self::project_key(&project.owner_id, &project.id);
        self.projects.lock().await.insert(key, project.clone());
        Ok(())
    }

    async fn get(&self, owner_id: &str, project_id: &ProjectId) -> StoreResult<Option<Project>> {
        let projects = self.projects.lock().await;
        Ok(projects.get(&Self::project_key(owner_id, project_id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_models::{AspectRatio, JobPhase, Plan, Scene, Shot};
    use reelgen_models::{CameraMove, Transition};

    fn sample_job(owner: &str) -> Job {
        let plan = Plan {
            title: "t".into(),
            narrative: "n".into(),
            total_duration: 6.0,
            scenes: vec![Scene {
                id: 1,
                name: "s".into(),
                description: "d".into(),
                mood: "m".into(),
                shots: vec![Shot {
                    id: 1,
                    duration: 6.0,
                    start_prompt: "p".into(),
                    end_prompt: "p".into(),
                    motion_prompt: "p".into(),
                    camera_move: CameraMove::Static,
                    lighting: "l".into(),
                    color_palette: None,
                    transition_out: Transition::Cut,
                }],
            }],
        };
        Job::from_plan(ProjectId::new(), owner, AspectRatio::Wide, &plan, false)
    }

    #[tokio::test]
    async fn test_get_is_owner_scoped() {
        let store = MemoryStore::new();
        let job = sample_job("owner-a");
        store.create(&job).await.unwrap();

        assert!(JobStore::get(&store, "owner-a", &job.id).await.unwrap().is_some());
        assert!(JobStore::get(&store, "owner-b", &job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let store = MemoryStore::new();
        let job = sample_job("owner-a");
        store.create(&job).await.unwrap();
        assert!(matches!(
            store.create(&job).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_lease_is_exclusive() {
        let store = MemoryStore::new();
        let job = sample_job("owner-a");
        store.create(&job).await.unwrap();
        let key = JobKey::for_job(&job);

        let lease = store
            .acquire_lease(&key, Duration::from_secs(60))
            .await
            .unwrap()
            .expect("first acquire succeeds");
        assert!(store
            .acquire_lease(&key, Duration::from_secs(60))
            .await
            .unwrap()
            .is_none());

        store.release_lease(&lease).await.unwrap();
        assert!(store
            .acquire_lease(&key, Duration::from_secs(60))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lease_expires() {
        let store = MemoryStore::new();
        let job = sample_job("owner-a");
        store.create(&job).await.unwrap();
        let key = JobKey::for_job(&job);

        let stale = store
            .acquire_lease(&key, Duration::from_secs(5))
            .await
            .unwrap()
            .unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        // Expired lease can be taken over and no longer commits.
        let fresh = store
            .acquire_lease(&key, Duration::from_secs(5))
            .await
            .unwrap()
            .expect("expired lease is claimable");

        let mut updated = job.clone();
        updated.advance_phase(JobPhase::GeneratingImages);
        assert!(matches!(
            store.commit(&stale, &updated).await,
            Err(StoreError::LeaseLost(_))
        ));
        store.commit(&fresh, &updated).await.unwrap();

        let read = JobStore::get(&store, "owner-a", &job.id).await.unwrap().unwrap();
        assert_eq!(read.phase, JobPhase::GeneratingImages);
    }

    #[tokio::test]
    async fn test_active_jobs_excludes_terminal() {
        let store = MemoryStore::new();
        let mut done = sample_job("owner-a");
        done.complete();
        store.create(&done).await.unwrap();

        let running = sample_job("owner-a");
        store.create(&running).await.unwrap();

        let active = store.active_jobs().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].job_id, running.id);
    }
}
