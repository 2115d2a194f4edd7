//! Prompt composition for the direction and refinement passes.

use reelgen_models::{
    AspectRatio, CameraMove, DirectorConstraints, Plan, Transition, MAX_SHOT_SECONDS,
    MIN_PROMPT_TOKENS, MIN_SHOT_SECONDS,
};

/// System prompt: the schema and every hard constraint the validator will
/// later enforce, so the model has no excuse.
pub fn system_prompt() -> String {
    let camera_moves = CameraMove::ALL
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let transitions = Transition::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a film director planning a short promotional video. Decompose the user's concept into scenes and shots and answer with a single JSON object, no prose, matching exactly this shape:

{{
  "title": "string",
  "narrative": "one-paragraph summary of the video's arc",
  "total_duration": <seconds>,
  "scenes": [
    {{
      "id": 1,
      "name": "string",
      "description": "string",
      "mood": "string",
      "shots": [
        {{
          "id": 1,
          "duration": <seconds>,
          "start_prompt": "detailed image prompt for the first frame",
          "end_prompt": "detailed image prompt for the last frame",
          "motion_prompt": "how the image moves between the two frames",
          "camera_move": "one of the allowed camera moves",
          "lighting": "string",
          "color_palette": "string (optional)",
          "transition_out": "one of the allowed transitions (optional, default cut)"
        }}
      ]
    }}
  ]
}}

Hard rules:
- Every shot duration is between {MIN_SHOT_SECONDS} and {MAX_SHOT_SECONDS} seconds.
- The sum of all shot durations must be within 10% of the requested target duration.
- Scene ids are 1, 2, 3... in order; shot ids restart at 1 inside each scene.
- start_prompt, end_prompt and motion_prompt each contain at least {MIN_PROMPT_TOKENS} words of concrete visual detail.
- camera_move must be one of: {camera_moves}.
- transition_out, when present, must be one of: {transitions}.
- Continuity: the end frame of each shot is the visual premise of the next shot's start frame.
"#
    )
}

/// User prompt for the initial direction pass.
pub fn direction_prompt(
    concept: &str,
    style: Option<&str>,
    target_duration: f64,
    aspect_ratio: AspectRatio,
    constraints: &DirectorConstraints,
) -> String {
    let mut prompt = format!(
        "Concept: {concept}\nTarget duration: {target_duration} seconds\nAspect ratio: {aspect_ratio}\n"
    );
    if let Some(style) = style {
        prompt.push_str(&format!("Visual style: {style}\n"));
    }
    if let Some(max_scenes) = constraints.max_scenes {
        prompt.push_str(&format!("Use at most {max_scenes} scenes.\n"));
    }
    if let Some(max_shots) = constraints.max_shots_per_scene {
        prompt.push_str(&format!("Use at most {max_shots} shots per scene.\n"));
    }
    if !constraints.include.is_empty() {
        prompt.push_str(&format!("Must include: {}.\n", constraints.include.join(", ")));
    }
    if !constraints.avoid.is_empty() {
        prompt.push_str(&format!("Must avoid: {}.\n", constraints.avoid.join(", ")));
    }
    prompt.push_str("Respond with the JSON plan only.");
    prompt
}

/// User prompt for a refinement pass over an existing plan.
pub fn refine_prompt(plan: &Plan, feedback: &str) -> String {
    let plan_json = serde_json::to_string_pretty(plan).unwrap_or_default();
    format!(
        "Here is the current plan:\n\n{plan_json}\n\nRevise it according to this feedback, keeping the same JSON shape and all hard rules. Keep the total duration close to {} seconds unless the feedback says otherwise.\n\nFeedback: {feedback}\n\nRespond with the full revised JSON plan only.",
        plan.total_duration
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_names_every_enum_value() {
        let prompt = system_prompt();
        for mv in CameraMove::ALL {
            assert!(prompt.contains(mv.as_str()), "missing {}", mv);
        }
        for t in Transition::ALL {
            assert!(prompt.contains(t.as_str()), "missing {}", t);
        }
        assert!(prompt.contains("at least 20 words"));
    }

    #[test]
    fn test_direction_prompt_carries_constraints() {
        let constraints = DirectorConstraints {
            max_scenes: Some(3),
            max_shots_per_scene: Some(2),
            include: vec!["the product logo".into()],
            avoid: vec!["text overlays".into()],
        };
        let prompt = direction_prompt(
            "a drone ascent over a pine forest at dawn",
            Some("cinematic"),
            30.0,
            AspectRatio::Wide,
            &constraints,
        );
        assert!(prompt.contains("30 seconds"));
        assert!(prompt.contains("16:9"));
        assert!(prompt.contains("at most 3 scenes"));
        assert!(prompt.contains("the product logo"));
        assert!(prompt.contains("text overlays"));
    }
}
