//! Strict plan validation.
//!
//! Validation is fail-first: the first violation is returned with its
//! scene/shot location. A raw plan that passes is converted into the typed
//! model; normalization happens afterwards.

use reelgen_models::{
    round_to_tenth, CameraMove, DirectorConstraints, Plan, Scene, Shot, Transition,
    DURATION_TOLERANCE, MAX_SHOT_SECONDS, MIN_PROMPT_TOKENS, MIN_SHOT_SECONDS,
};

use crate::error::{PlanLocation, ValidationError, ValidationErrorKind};
use crate::parse::{RawPlan, RawScene, RawShot};

const EPSILON: f64 = 1e-6;

fn token_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Validate a raw plan against the target duration and constraints,
/// producing the typed plan on success.
pub fn validate_plan(
    raw: RawPlan,
    target_duration: f64,
    constraints: &DirectorConstraints,
) -> Result<Plan, ValidationError> {
    let title = require_text(raw.title, "title", None)?;
    let narrative = require_text(raw.narrative, "narrative", None)?;

    let raw_scenes = match raw.scenes {
        Some(scenes) if !scenes.is_empty() => scenes,
        _ => {
            return Err(ValidationError::new(
                ValidationErrorKind::MissingField,
                "plan has no scenes",
            ))
        }
    };

    if let Some(max_scenes) = constraints.max_scenes {
        if raw_scenes.len() as u32 > max_scenes {
            return Err(ValidationError::new(
                ValidationErrorKind::SceneCount,
                format!("{} scenes exceeds the limit of {}", raw_scenes.len(), max_scenes),
            ));
        }
    }

    let mut scenes = Vec::with_capacity(raw_scenes.len());
    for (scene_index, raw_scene) in raw_scenes.into_iter().enumerate() {
        let expected_id = scene_index as u32 + 1;
        scenes.push(validate_scene(raw_scene, expected_id, constraints)?);
    }

    let total: f64 = scenes
        .iter()
        .flat_map(|s| s.shots.iter())
        .map(|shot| shot.duration)
        .sum();
    let total = round_to_tenth(total);
    let low = target_duration * (1.0 - DURATION_TOLERANCE);
    let high = target_duration * (1.0 + DURATION_TOLERANCE);
    if total < low - EPSILON || total > high + EPSILON {
        return Err(ValidationError::new(
            ValidationErrorKind::TotalDuration,
            format!(
                "total duration {:.1}s is outside [{:.1}, {:.1}] for a {:.0}s target",
                total, low, high, target_duration
            ),
        ));
    }

    Ok(Plan {
        title,
        narrative,
        total_duration: total,
        scenes,
    })
}

fn validate_scene(
    raw: RawScene,
    expected_id: u32,
    constraints: &DirectorConstraints,
) -> Result<Scene, ValidationError> {
    let location = PlanLocation::scene(expected_id);

    // Missing ids are filled from position (flat scene-list ingress);
    // present ids must match it.
    if let Some(id) = raw.id {
        if id != expected_id {
            return Err(ValidationError::at(
                ValidationErrorKind::BadId,
                location,
                format!("scene id {} does not match position {}", id, expected_id),
            ));
        }
    }

    let name = require_text(raw.name, "name", Some(location))?;
    let description = require_text(raw.description, "description", Some(location))?;
    let mood = require_text(raw.mood, "mood", Some(location))?;

    let raw_shots = match raw.shots {
        Some(shots) if !shots.is_empty() => shots,
        _ => {
            return Err(ValidationError::at(
                ValidationErrorKind::MissingField,
                location,
                "scene has no shots",
            ))
        }
    };

    if let Some(max_shots) = constraints.max_shots_per_scene {
        if raw_shots.len() as u32 > max_shots {
            return Err(ValidationError::at(
                ValidationErrorKind::ShotCount,
                location,
                format!("{} shots exceeds the limit of {}", raw_shots.len(), max_shots),
            ));
        }
    }

    let mut shots = Vec::with_capacity(raw_shots.len());
    for (shot_index, raw_shot) in raw_shots.into_iter().enumerate() {
        let expected_shot_id = shot_index as u32 + 1;
        shots.push(validate_shot(raw_shot, expected_id, expected_shot_id)?);
    }

    Ok(Scene {
        id: expected_id,
        name,
        description,
        mood,
        shots,
    })
}

fn validate_shot(raw: RawShot, scene_id: u32, expected_id: u32) -> Result<Shot, ValidationError> {
    let location = PlanLocation::shot(scene_id, expected_id);

    if let Some(id) = raw.id {
        if id != expected_id {
            return Err(ValidationError::at(
                ValidationErrorKind::BadId,
                location,
                format!("shot id {} does not match position {}", id, expected_id),
            ));
        }
    }

    let duration = raw.duration.ok_or_else(|| {
        ValidationError::at(ValidationErrorKind::MissingField, location, "shot has no duration")
    })?;
    if duration < MIN_SHOT_SECONDS - EPSILON || duration > MAX_SHOT_SECONDS + EPSILON {
        return Err(ValidationError::at(
            ValidationErrorKind::Duration,
            location,
            format!(
                "duration {:.1}s is outside [{:.0}, {:.0}]",
                duration, MIN_SHOT_SECONDS, MAX_SHOT_SECONDS
            ),
        ));
    }

    let start_prompt = require_prompt(raw.start_prompt, "start_prompt", location)?;
    let end_prompt = require_prompt(raw.end_prompt, "end_prompt", location)?;
    let motion_prompt = require_prompt(raw.motion_prompt, "motion_prompt", location)?;

    let camera_move = match raw.camera_move.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => parse_camera_move(value).ok_or_else(|| {
            ValidationError::at(
                ValidationErrorKind::CameraMove,
                location,
                format!("unknown camera move \"{}\"", value),
            )
        })?,
        _ => {
            return Err(ValidationError::at(
                ValidationErrorKind::MissingField,
                location,
                "shot has no camera_move",
            ))
        }
    };

    let lighting = require_text(raw.lighting, "lighting", Some(location))?;

    let transition_out = match raw.transition_out.as_deref().map(str::trim) {
        None | Some("") => Transition::Cut,
        Some(value) => parse_transition(value).ok_or_else(|| {
            ValidationError::at(
                ValidationErrorKind::Transition,
                location,
                format!("unknown transition \"{}\"", value),
            )
        })?,
    };

    Ok(Shot {
        id: expected_id,
        duration,
        start_prompt,
        end_prompt,
        motion_prompt,
        camera_move,
        lighting,
        color_palette: raw
            .color_palette
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        transition_out,
    })
}

fn require_text(
    value: Option<String>,
    field: &str,
    location: Option<PlanLocation>,
) -> Result<String, ValidationError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => {
            let message = format!("missing or empty {}", field);
            Err(match location {
                Some(loc) => ValidationError::at(ValidationErrorKind::MissingField, loc, message),
                None => ValidationError::new(ValidationErrorKind::MissingField, message),
            })
        }
    }
}

fn require_prompt(
    value: Option<String>,
    field: &str,
    location: PlanLocation,
) -> Result<String, ValidationError> {
    let text = require_text(value, field, Some(location))?;
    let tokens = token_count(&text);
    if tokens < MIN_PROMPT_TOKENS {
        return Err(ValidationError::at(
            ValidationErrorKind::PromptTooShort,
            location,
            format!("{} has {} words, needs at least {}", field, tokens, MIN_PROMPT_TOKENS),
        ));
    }
    Ok(text)
}

fn parse_camera_move(value: &str) -> Option<CameraMove> {
    CameraMove::ALL.iter().copied().find(|m| m.as_str() == value)
}

fn parse_transition(value: &str) -> Option<Transition> {
    Transition::ALL.iter().copied().find(|t| t.as_str() == value)
}
