//! Shot plan model: the validated decomposition of a concept into scenes
//! and 5-10 second shots, as produced by the director.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Minimum duration of a single shot, in seconds.
pub const MIN_SHOT_SECONDS: f64 = 5.0;

/// Maximum duration of a single shot, in seconds.
pub const MAX_SHOT_SECONDS: f64 = 10.0;

/// Allowed deviation of the plan total from the requested target (fraction).
pub const DURATION_TOLERANCE: f64 = 0.1;

/// Minimum whitespace-separated tokens in each prompt field.
pub const MIN_PROMPT_TOKENS: usize = 20;

/// Round a duration to one decimal place.
pub fn round_to_tenth(seconds: f64) -> f64 {
    (seconds * 10.0).round() / 10.0
}

/// Camera movement for a shot. Closed set; the director rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CameraMove {
    Static,
    PushIn,
    PullOut,
    PanLeft,
    PanRight,
    TiltUp,
    TiltDown,
    CraneUp,
    CraneDown,
    DollyLeft,
    DollyRight,
}

impl CameraMove {
    /// All accepted values, in prompt-documentation order.
    pub const ALL: [CameraMove; 11] = [
        CameraMove::Static,
        CameraMove::PushIn,
        CameraMove::PullOut,
        CameraMove::PanLeft,
        CameraMove::PanRight,
        CameraMove::TiltUp,
        CameraMove::TiltDown,
        CameraMove::CraneUp,
        CameraMove::CraneDown,
        CameraMove::DollyLeft,
        CameraMove::DollyRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraMove::Static => "static",
            CameraMove::PushIn => "push_in",
            CameraMove::PullOut => "pull_out",
            CameraMove::PanLeft => "pan_left",
            CameraMove::PanRight => "pan_right",
            CameraMove::TiltUp => "tilt_up",
            CameraMove::TiltDown => "tilt_down",
            CameraMove::CraneUp => "crane_up",
            CameraMove::CraneDown => "crane_down",
            CameraMove::DollyLeft => "dolly_left",
            CameraMove::DollyRight => "dolly_right",
        }
    }
}

impl fmt::Display for CameraMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transition applied at the end of a shot. Closed set, defaults to a hard cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    #[default]
    Cut,
    Crossfade,
    FadeBlack,
    FadeWhite,
    WipeLeft,
    WipeRight,
}

impl Transition {
    pub const ALL: [Transition; 6] = [
        Transition::Cut,
        Transition::Crossfade,
        Transition::FadeBlack,
        Transition::FadeWhite,
        Transition::WipeLeft,
        Transition::WipeRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Cut => "cut",
            Transition::Crossfade => "crossfade",
            Transition::FadeBlack => "fade_black",
            Transition::FadeWhite => "fade_white",
            Transition::WipeLeft => "wipe_left",
            Transition::WipeRight => "wipe_right",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An atomic 5-10 second unit. Produces exactly two frames and one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Shot {
    /// 1-based position within the scene.
    pub id: u32,

    /// Duration in seconds, rounded to 0.1.
    pub duration: f64,

    /// Prompt for the opening frame.
    pub start_prompt: String,

    /// Prompt for the closing frame.
    pub end_prompt: String,

    /// Prompt describing motion between the two frames.
    pub motion_prompt: String,

    /// Camera movement.
    pub camera_move: CameraMove,

    /// Lighting description.
    pub lighting: String,

    /// Optional color palette hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<String>,

    /// Transition into the next shot.
    #[serde(default)]
    pub transition_out: Transition,
}

/// A narrative unit of the plan, containing one or more shots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// 1-based position within the plan.
    pub id: u32,
    pub name: String,
    pub description: String,
    pub mood: String,
    pub shots: Vec<Shot>,
}

/// The validated, normalized shot decomposition of a concept.
///
/// Immutable once approved; jobs carry frozen copies of the prompts so
/// later plan edits cannot corrupt an in-flight job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    pub title: String,
    pub narrative: String,

    /// Sum of all shot durations, rounded to 0.1.
    pub total_duration: f64,

    pub scenes: Vec<Scene>,
}

impl Plan {
    /// Total number of shots across all scenes.
    pub fn shot_count(&self) -> usize {
        self.scenes.iter().map(|s| s.shots.len()).sum()
    }

    /// Iterate shots in scene-then-shot order.
    pub fn iter_shots(&self) -> impl Iterator<Item = (&Scene, &Shot)> {
        self.scenes
            .iter()
            .flat_map(|scene| scene.shots.iter().map(move |shot| (scene, shot)))
    }

    /// Sum of shot durations, rounded to 0.1.
    pub fn computed_total(&self) -> f64 {
        round_to_tenth(
            self.iter_shots()
                .map(|(_, shot)| shot.duration)
                .sum::<f64>(),
        )
    }
}
