//! Lenient parsing of model output into a raw, unvalidated plan.
//!
//! Models wrap JSON in markdown fences or stray prose despite instructions;
//! we strip fences and fall back to the outermost brace span before handing
//! the text to serde. Field names accept both snake_case and the camelCase
//! the hosted planners tend to emit.

use serde::Deserialize;

use crate::error::ValidationError;

/// Unvalidated plan as the model produced it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlan {
    pub title: Option<String>,
    pub narrative: Option<String>,
    #[serde(alias = "totalDuration")]
    pub total_duration: Option<f64>,
    pub scenes: Option<Vec<RawScene>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawScene {
    /// Missing ids are filled from position (flat scene-list ingress).
    pub id: Option<u32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub mood: Option<String>,
    pub shots: Option<Vec<RawShot>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawShot {
    pub id: Option<u32>,
    pub duration: Option<f64>,
    #[serde(alias = "startPrompt")]
    pub start_prompt: Option<String>,
    #[serde(alias = "endPrompt")]
    pub end_prompt: Option<String>,
    #[serde(alias = "motionPrompt")]
    pub motion_prompt: Option<String>,
    #[serde(alias = "cameraMove")]
    pub camera_move: Option<String>,
    pub lighting: Option<String>,
    #[serde(alias = "colorPalette")]
    pub color_palette: Option<String>,
    #[serde(alias = "transitionOut")]
    pub transition_out: Option<String>,
}

/// Parse model output into a raw plan.
pub fn parse_raw_plan(raw: &str) -> Result<RawPlan, ValidationError> {
    let candidate = extract_json(raw);
    serde_json::from_str(candidate)
        .map_err(|e| ValidationError::malformed(format!("response is not a JSON plan: {}", e)))
}

/// Strip markdown fences and stray prose around the JSON object.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();

    // ```json ... ``` or ``` ... ```
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
    }

    // Fall back to the outermost brace span.
    if !trimmed.starts_with('{') {
        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
            if start < end {
                return &trimmed[start..=end];
            }
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{"title": "x", "scenes": []}"#;

    #[test]
    fn test_plain_json() {
        let plan = parse_raw_plan(PLAIN).unwrap();
        assert_eq!(plan.title.as_deref(), Some("x"));
    }

    #[test]
    fn test_fenced_json() {
        let fenced = format!("```json\n{}\n```", PLAIN);
        assert!(parse_raw_plan(&fenced).is_ok());

        let bare_fence = format!("```\n{}\n```", PLAIN);
        assert!(parse_raw_plan(&bare_fence).is_ok());
    }

    #[test]
    fn test_prose_around_json() {
        let chatty = format!("Here is your plan:\n{}\nHope you like it!", PLAIN);
        assert!(parse_raw_plan(&chatty).is_ok());
    }

    #[test]
    fn test_camel_case_aliases() {
        let camel = r#"{"title":"x","totalDuration":30,"scenes":[{"shots":[{"startPrompt":"a","cameraMove":"static"}]}]}"#;
        let plan = parse_raw_plan(camel).unwrap();
        let scenes = plan.scenes.unwrap();
        let shot = &scenes[0].shots.as_ref().unwrap()[0];
        assert_eq!(shot.start_prompt.as_deref(), Some("a"));
        assert_eq!(shot.camera_move.as_deref(), Some("static"));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = parse_raw_plan("I cannot help with that.").unwrap_err();
        assert_eq!(err.kind, crate::error::ValidationErrorKind::Malformed);
    }
}
