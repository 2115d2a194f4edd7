//! Shared data models for the reelgen pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Shot plans (scenes, shots, camera moves, transitions)
//! - Jobs and per-shot runtime state
//! - Projects and provider selection tags
//! - Aspect ratios and render dimensions

pub mod aspect;
pub mod job;
pub mod plan;
pub mod project;

// Re-export common types
pub use aspect::{AspectRatio, AspectRatioParseError};
pub use job::{Job, JobId, JobPhase, ShotRecord, ShotState};
pub use plan::{
    round_to_tenth, CameraMove, Plan, Scene, Shot, Transition, DURATION_TOLERANCE,
    MAX_SHOT_SECONDS, MIN_PROMPT_TOKENS, MIN_SHOT_SECONDS,
};
pub use project::{
    CompileProviderKind, DirectorConstraints, ImageProviderKind, Project, ProjectId,
    ProjectStatus, ProviderSelection, TextProviderKind, VideoProviderKind,
};
