//! Director error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use reelgen_providers::ProviderError;

pub type DirectorResult<T> = Result<T, DirectorError>;

#[derive(Debug, Error)]
pub enum DirectorError {
    /// The model's plan failed parsing or validation. Never retried here;
    /// the caller decides whether to re-invoke.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Provider failure, bubbled unchanged so the caller sees the
    /// retryable/permanent classification.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Where in the plan a violation was found (1-based indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLocation {
    pub scene: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shot: Option<u32>,
}

impl PlanLocation {
    pub fn scene(scene: u32) -> Self {
        Self { scene, shot: None }
    }

    pub fn shot(scene: u32, shot: u32) -> Self {
        Self {
            scene,
            shot: Some(shot),
        }
    }
}

impl fmt::Display for PlanLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shot {
            Some(shot) => write!(f, "scene {} shot {}", self.scene, shot),
            None => write!(f, "scene {}", self.scene),
        }
    }
}

/// What kind of violation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// The response was not parseable JSON.
    Malformed,
    MissingField,
    SceneCount,
    ShotCount,
    BadId,
    Duration,
    PromptTooShort,
    CameraMove,
    Transition,
    TotalDuration,
}

/// A single validation failure. Validation stops at the first violation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PlanLocation>,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: None,
            message: message.into(),
        }
    }

    pub fn at(
        kind: ValidationErrorKind,
        location: PlanLocation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location: Some(location),
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::Malformed, message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "Invalid plan at {}: {}", loc, self.message),
            None => write!(f, "Invalid plan: {}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let err = ValidationError::at(
            ValidationErrorKind::CameraMove,
            PlanLocation::shot(2, 3),
            "unknown camera move \"zoom_through\"",
        );
        let text = err.to_string();
        assert!(text.contains("scene 2 shot 3"));
        assert!(text.contains("zoom_through"));
    }
}
