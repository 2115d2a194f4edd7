//! Durable job records for the generation pipeline.
//!
//! A job is created when a plan is approved and is mutated only by the
//! orchestrator holding its write lease. Shots carry frozen copies of the
//! prompts they need so a job can resume independent of the plan.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AspectRatio, Plan, ProjectId};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse phase of a job. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    #[default]
    Pending,
    GeneratingImages,
    ImagesComplete,
    GeneratingVideos,
    VideosComplete,
    Compiling,
    Complete,
    Failed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Pending => "pending",
            JobPhase::GeneratingImages => "generating_images",
            JobPhase::ImagesComplete => "images_complete",
            JobPhase::GeneratingVideos => "generating_videos",
            JobPhase::VideosComplete => "videos_complete",
            JobPhase::Compiling => "compiling",
            JobPhase::Complete => "complete",
            JobPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Complete | JobPhase::Failed)
    }

    /// Position in the forward order. `Failed` is reachable from any
    /// non-terminal phase and ranks last.
    fn rank(&self) -> u8 {
        match self {
            JobPhase::Pending => 0,
            JobPhase::GeneratingImages => 1,
            JobPhase::ImagesComplete => 2,
            JobPhase::GeneratingVideos => 3,
            JobPhase::VideosComplete => 4,
            JobPhase::Compiling => 5,
            JobPhase::Complete => 6,
            JobPhase::Failed => 7,
        }
    }

    /// Whether a transition from `self` to `next` preserves monotonicity.
    pub fn can_advance_to(&self, next: JobPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == JobPhase::Failed {
            return true;
        }
        next.rank() > self.rank()
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-shot progress through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShotState {
    /// Waiting for work (either frames or clip submission).
    #[default]
    Pending,
    /// Start frame synthesis in flight.
    GeneratingStart,
    /// End frame synthesis in flight.
    GeneratingEnd,
    /// Clip request about to be submitted.
    SubmittingVideo,
    /// Clip request submitted, awaiting the remote queue.
    PollingVideo,
    /// Clip ready.
    Complete,
    /// Shot failed permanently.
    Failed,
}

impl ShotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShotState::Pending => "pending",
            ShotState::GeneratingStart => "generating_start",
            ShotState::GeneratingEnd => "generating_end",
            ShotState::SubmittingVideo => "submitting_video",
            ShotState::PollingVideo => "polling_video",
            ShotState::Complete => "complete",
            ShotState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ShotState::Complete | ShotState::Failed)
    }
}

/// Runtime state of one shot within a job, with frozen prompt copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShotRecord {
    /// Scene the shot belongs to (1-based).
    pub scene_id: u32,

    /// Shot position within the scene (1-based).
    pub shot_index: u32,

    /// Clip duration in seconds.
    pub duration: f64,

    // Frozen prompt copies; the job never re-reads the plan.
    pub start_prompt: String,
    pub end_prompt: String,
    pub motion_prompt: String,

    #[serde(default)]
    pub state: ShotState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_image_url: Option<String>,

    /// Handle returned by the video provider's submit call. Checked before
    /// submitting so a resumed job never re-issues the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_request_handle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ShotRecord {
    /// Both frames are ready for clip submission.
    pub fn has_images(&self) -> bool {
        self.start_image_url.is_some() && self.end_image_url.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Mark the shot permanently failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = ShotState::Failed;
        self.error_message = Some(error.into());
    }
}

/// A durable instance of running a plan through the generation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,
    pub project_id: ProjectId,
    pub owner_id: String,
    pub aspect_ratio: AspectRatio,

    #[serde(default)]
    pub phase: JobPhase,

    /// Progress percentage (0-100). Never decreases; 100 only on Complete.
    #[serde(default)]
    pub progress: u8,

    /// Per-shot records in scene-then-shot order.
    pub shots: Vec<ShotRecord>,

    /// Whether a compile provider is configured for this job.
    #[serde(default)]
    pub compile_enabled: bool,

    /// Poll ticks consumed in the video phase.
    #[serde(default)]
    pub poll_attempts: u32,

    /// Poll ticks consumed in the compile phase.
    #[serde(default)]
    pub compile_poll_attempts: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_request_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_artifact_url: Option<String>,

    /// Set only when phase is Failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Observed at the next wake-up; transitions the job to Failed.
    #[serde(default)]
    pub cancel_requested: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a job from an approved plan, freezing every prompt the
    /// pipeline will need.
    pub fn from_plan(
        project_id: ProjectId,
        owner_id: impl Into<String>,
        aspect_ratio: AspectRatio,
        plan: &Plan,
        compile_enabled: bool,
    ) -> Self {
        let now = Utc::now();
        let shots = plan
            .iter_shots()
            .map(|(scene, shot)| ShotRecord {
                scene_id: scene.id,
                shot_index: shot.id,
                duration: shot.duration,
                start_prompt: shot.start_prompt.clone(),
                end_prompt: shot.end_prompt.clone(),
                motion_prompt: shot.motion_prompt.clone(),
                state: ShotState::Pending,
                start_image_url: None,
                end_image_url: None,
                video_request_handle: None,
                video_url: None,
                error_message: None,
            })
            .collect();

        Self {
            id: JobId::new(),
            project_id,
            owner_id: owner_id.into(),
            aspect_ratio,
            phase: JobPhase::Pending,
            progress: 0,
            shots,
            compile_enabled,
            poll_attempts: 0,
            compile_poll_attempts: 0,
            compile_request_id: None,
            final_artifact_url: None,
            error_message: None,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance to the next phase. Returns false (and leaves the job
    /// untouched) if the transition would regress.
    pub fn advance_phase(&mut self, next: JobPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            return false;
        }
        self.phase = next;
        self.updated_at = Utc::now();
        true
    }

    /// Transition to Failed with a message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.phase = JobPhase::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Transition to Complete, forcing progress to 100.
    pub fn complete(&mut self) {
        self.phase = JobPhase::Complete;
        self.progress = 100;
        self.updated_at = Utc::now();
    }

    /// Recompute progress from per-shot outcomes.
    ///
    /// Each generated frame and each generated clip counts one unit, plus
    /// one unit for compile success when a compile provider is configured.
    /// Capped below 100 until the job is Complete, and never decreases.
    pub fn recompute_progress(&mut self) {
        let shot_units: u32 = self
            .shots
            .iter()
            .map(|s| {
                u32::from(s.start_image_url.is_some())
                    + u32::from(s.end_image_url.is_some())
                    + u32::from(s.video_url.is_some())
            })
            .sum();
        let compile_units = u32::from(self.compile_enabled && self.final_artifact_url.is_some());

        let total = 3 * self.shots.len() as u32 + u32::from(self.compile_enabled);
        if total == 0 {
            return;
        }

        let raw = (100 * (shot_units + compile_units)) as f64 / total as f64;
        let mut pct = raw.round() as u8;
        if self.phase != JobPhase::Complete {
            pct = pct.min(99);
        }
        if pct > self.progress {
            self.progress = pct;
            self.updated_at = Utc::now();
        }
    }

    /// Shots that ended with both frames generated.
    pub fn shots_with_images(&self) -> impl Iterator<Item = &ShotRecord> {
        self.shots.iter().filter(|s| s.has_images())
    }

    /// Clip URLs in scene-then-shot order, for compilation.
    pub fn clip_urls(&self) -> Vec<String> {
        self.shots
            .iter()
            .filter_map(|s| s.video_url.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraMove, Scene, Shot, Transition};

    fn prompt() -> String {
        vec!["word"; 22].join(" ")
    }

    fn sample_plan(shots_per_scene: usize) -> Plan {
        Plan {
            title: "Dawn flight".into(),
            narrative: "ascent over a forest".into(),
            total_duration: 6.0 * shots_per_scene as f64,
            scenes: vec![Scene {
                id: 1,
                name: "opening".into(),
                description: "trees".into(),
                mood: "calm".into(),
                shots: (1..=shots_per_scene as u32)
                    .map(|id| Shot {
                        id,
                        duration: 6.0,
                        start_prompt: prompt(),
                        end_prompt: prompt(),
                        motion_prompt: prompt(),
                        camera_move: CameraMove::CraneUp,
                        lighting: "dawn".into(),
                        color_palette: None,
                        transition_out: Transition::Cut,
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_from_plan_freezes_prompts() {
        let plan = sample_plan(3);
        let job = Job::from_plan(ProjectId::new(), "owner-1", AspectRatio::Wide, &plan, false);

        assert_eq!(job.shots.len(), 3);
        assert_eq!(job.phase, JobPhase::Pending);
        assert_eq!(job.shots[2].shot_index, 3);
        assert_eq!(job.shots[0].start_prompt, plan.scenes[0].shots[0].start_prompt);
    }

    #[test]
    fn test_phase_monotonicity() {
        let plan = sample_plan(1);
        let mut job = Job::from_plan(ProjectId::new(), "owner-1", AspectRatio::Wide, &plan, false);

        assert!(job.advance_phase(JobPhase::GeneratingImages));
        assert!(job.advance_phase(JobPhase::GeneratingVideos));
        // Regression is refused.
        assert!(!job.advance_phase(JobPhase::GeneratingImages));
        assert_eq!(job.phase, JobPhase::GeneratingVideos);

        job.fail("boom");
        assert!(job.phase.is_terminal());
        assert!(!job.advance_phase(JobPhase::Complete));
    }

    #[test]
    fn test_progress_units() {
        let plan = sample_plan(2);
        let mut job = Job::from_plan(ProjectId::new(), "owner-1", AspectRatio::Wide, &plan, false);

        // 6 units total without compile.
        job.shots[0].start_image_url = Some("u".into());
        job.recompute_progress();
        assert_eq!(job.progress, 17);

        job.shots[0].end_image_url = Some("u".into());
        job.shots[0].video_url = Some("u".into());
        job.shots[1].start_image_url = Some("u".into());
        job.shots[1].end_image_url = Some("u".into());
        job.recompute_progress();
        assert_eq!(job.progress, 83);

        // All units done but not yet Complete: capped at 99.
        job.shots[1].video_url = Some("u".into());
        job.recompute_progress();
        assert_eq!(job.progress, 99);

        job.complete();
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn test_progress_never_decreases() {
        let plan = sample_plan(2);
        let mut job = Job::from_plan(ProjectId::new(), "owner-1", AspectRatio::Wide, &plan, true);

        job.shots[0].start_image_url = Some("u".into());
        job.shots[0].end_image_url = Some("u".into());
        job.recompute_progress();
        let before = job.progress;

        // Recomputing with no new units holds steady.
        job.recompute_progress();
        assert_eq!(job.progress, before);
    }

    #[test]
    fn test_clip_urls_preserve_declared_order() {
        let plan = sample_plan(3);
        let mut job = Job::from_plan(ProjectId::new(), "owner-1", AspectRatio::Wide, &plan, true);

        // Completion order 3, 1, 2 must not matter.
        job.shots[2].video_url = Some("c".into());
        job.shots[0].video_url = Some("a".into());
        job.shots[1].video_url = Some("b".into());

        assert_eq!(job.clip_urls(), vec!["a", "b", "c"]);
    }
}
