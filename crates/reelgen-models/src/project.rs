//! Projects: the owner-scoped container for a concept, its provider
//! selection, and the plan produced by the director.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AspectRatio, Plan};

/// Unique identifier for a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text completion provider tag.
///
/// Closed sets: an unknown tag is rejected at project creation by serde,
/// never at phase entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextProviderKind {
    /// Any chat endpoint speaking the OpenAI-compatible wire shape.
    #[default]
    OpenaiCompatible,
}

/// Image synthesis provider tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageProviderKind {
    /// Generic synchronous HTTP synthesis endpoint.
    #[default]
    Http,
}

/// Video synthesis provider tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoProviderKind {
    /// Submit/poll queue endpoint that accepts start and end frames.
    #[default]
    FrameBridge,
    /// Submit/poll queue endpoint that only accepts a start frame.
    MotionOnly,
}

impl VideoProviderKind {
    /// Whether the provider accepts an end frame on submission.
    pub fn supports_end_frame(&self) -> bool {
        matches!(self, VideoProviderKind::FrameBridge)
    }
}

/// Clip compilation provider tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompileProviderKind {
    /// Skip compilation; per-shot clips are the deliverable.
    #[default]
    None,
    /// Generic submit/poll HTTP compilation endpoint.
    Http,
}

impl CompileProviderKind {
    pub fn is_none(&self) -> bool {
        matches!(self, CompileProviderKind::None)
    }
}

/// The four-capability provider selection for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ProviderSelection {
    #[serde(default)]
    pub text: TextProviderKind,
    #[serde(default)]
    pub image: ImageProviderKind,
    #[serde(default)]
    pub video: VideoProviderKind,
    #[serde(default)]
    pub compile: CompileProviderKind,
}

/// Optional constraints passed through to the director.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct DirectorConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scenes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_shots_per_scene: Option<u32>,
    /// Elements the plan must include.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Elements the plan must avoid.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoid: Vec<String>,
}

/// Project lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Created, no plan yet.
    #[default]
    Draft,
    /// A plan exists and may still be refined.
    Directed,
    /// The plan is frozen and a job may be started.
    Approved,
    /// A job has been started from the approved plan.
    Generating,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Directed => "directed",
            ProjectStatus::Approved => "approved",
            ProjectStatus::Generating => "generating",
        }
    }
}

/// Owner-scoped project record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: ProjectId,
    pub owner_id: String,
    pub name: String,

    /// The natural-language concept the director decomposes.
    pub concept: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    /// Requested video length in seconds.
    pub target_duration: f64,

    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    #[serde(default)]
    pub providers: ProviderSelection,

    #[serde(default)]
    pub constraints: DirectorConstraints,

    #[serde(default)]
    pub status: ProjectStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new draft project.
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        concept: impl Into<String>,
        target_duration: f64,
        aspect_ratio: AspectRatio,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            owner_id: owner_id.into(),
            name: name.into(),
            concept: concept.into(),
            style: None,
            target_duration,
            aspect_ratio,
            providers: ProviderSelection::default(),
            constraints: DirectorConstraints::default(),
            status: ProjectStatus::Draft,
            plan: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a freshly directed (or refined) plan.
    pub fn set_plan(&mut self, plan: Plan) {
        self.plan = Some(plan);
        self.status = ProjectStatus::Directed;
        self.updated_at = Utc::now();
    }

    /// Freeze the current plan. Returns false if there is nothing to approve.
    pub fn approve(&mut self) -> bool {
        if self.plan.is_none() || self.status == ProjectStatus::Generating {
            return false;
        }
        self.status = ProjectStatus::Approved;
        self.updated_at = Utc::now();
        true
    }

    /// Mark that a job has been started from the approved plan.
    pub fn mark_generating(&mut self) {
        self.status = ProjectStatus::Generating;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_tag_rejected() {
        let err = serde_json::from_str::<ProviderSelection>(r#"{"video": "openrouter"}"#);
        assert!(err.is_err());

        let ok: ProviderSelection =
            serde_json::from_str(r#"{"video": "motion_only", "compile": "none"}"#).unwrap();
        assert_eq!(ok.video, VideoProviderKind::MotionOnly);
        assert!(ok.compile.is_none());
        assert!(!ok.video.supports_end_frame());
    }

    #[test]
    fn test_approve_requires_plan() {
        let mut project = Project::new("owner-1", "promo", "a drone ascent", 30.0, AspectRatio::Wide);
        assert!(!project.approve());

        project.set_plan(Plan {
            title: "t".into(),
            narrative: "n".into(),
            total_duration: 30.0,
            scenes: vec![],
        });
        assert_eq!(project.status, ProjectStatus::Directed);
        assert!(project.approve());
        assert_eq!(project.status, ProjectStatus::Approved);
    }
}
