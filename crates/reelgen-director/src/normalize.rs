//! Plan normalization.
//!
//! Applied after validation and safe to apply repeatedly: trims every string
//! field, rounds durations to 0.1s, renumbers scene and shot ids
//! sequentially, and recomputes the total from the rounded shot durations.

use reelgen_models::{round_to_tenth, Plan};

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Normalize a validated plan in place.
pub fn normalize_plan(plan: &mut Plan) {
    trim_in_place(&mut plan.title);
    trim_in_place(&mut plan.narrative);

    for (scene_index, scene) in plan.scenes.iter_mut().enumerate() {
        scene.id = scene_index as u32 + 1;
        trim_in_place(&mut scene.name);
        trim_in_place(&mut scene.description);
        trim_in_place(&mut scene.mood);

        for (shot_index, shot) in scene.shots.iter_mut().enumerate() {
            shot.id = shot_index as u32 + 1;
            shot.duration = round_to_tenth(shot.duration);
            trim_in_place(&mut shot.start_prompt);
            trim_in_place(&mut shot.end_prompt);
            trim_in_place(&mut shot.motion_prompt);
            trim_in_place(&mut shot.lighting);
            if let Some(palette) = &mut shot.color_palette {
                trim_in_place(palette);
                if palette.is_empty() {
                    shot.color_palette = None;
                }
            }
        }
    }

    plan.total_duration = plan.computed_total();
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_models::{CameraMove, Scene, Shot, Transition};

    fn prompt() -> String {
        vec!["word"; 22].join(" ")
    }

    fn messy_plan() -> Plan {
        Plan {
            title: "  Dawn Flight  ".into(),
            narrative: "ascent\n".into(),
            total_duration: 0.0,
            scenes: vec![Scene {
                id: 7,
                name: " open ".into(),
                description: "d".into(),
                mood: "calm".into(),
                shots: vec![
                    Shot {
                        id: 9,
                        duration: 7.4499,
                        start_prompt: format!("  {}  ", prompt()),
                        end_prompt: prompt(),
                        motion_prompt: prompt(),
                        camera_move: CameraMove::CraneUp,
                        lighting: "dawn".into(),
                        color_palette: Some("  ".into()),
                        transition_out: Transition::Cut,
                    },
                    Shot {
                        id: 1,
                        duration: 7.56,
                        start_prompt: prompt(),
                        end_prompt: prompt(),
                        motion_prompt: prompt(),
                        camera_move: CameraMove::Static,
                        lighting: "dawn".into(),
                        color_palette: Some(" warm amber ".into()),
                        transition_out: Transition::Crossfade,
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_normalize_rounds_renumbers_and_totals() {
        let mut plan = messy_plan();
        normalize_plan(&mut plan);

        assert_eq!(plan.title, "Dawn Flight");
        assert_eq!(plan.scenes[0].id, 1);
        assert_eq!(plan.scenes[0].shots[0].id, 1);
        assert_eq!(plan.scenes[0].shots[1].id, 2);
        assert_eq!(plan.scenes[0].shots[0].duration, 7.4);
        assert_eq!(plan.scenes[0].shots[1].duration, 7.6);
        assert_eq!(plan.scenes[0].shots[0].color_palette, None);
        assert_eq!(
            plan.scenes[0].shots[1].color_palette.as_deref(),
            Some("warm amber")
        );
        assert_eq!(plan.total_duration, 15.0);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut once = messy_plan();
        normalize_plan(&mut once);

        let mut twice = once.clone();
        normalize_plan(&mut twice);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut plan = messy_plan();
        normalize_plan(&mut plan);

        let json = serde_json::to_string(&plan).unwrap();
        let back: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
    }
}
