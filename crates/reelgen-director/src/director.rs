//! The AI director: turns a concept into a validated, normalized plan.

use std::sync::Arc;

use tracing::{debug, info};

use reelgen_models::{AspectRatio, DirectorConstraints, Plan};
use reelgen_providers::{ChatOptions, CostBreakdown, ProviderBundle, TextCompletion};

use crate::error::DirectorResult;
use crate::normalize::normalize_plan;
use crate::parse::parse_raw_plan;
use crate::prompts;
use crate::validate::validate_plan;

/// Everything the director needs for one direction pass.
#[derive(Debug, Clone)]
pub struct DirectionRequest {
    pub concept: String,
    pub style: Option<String>,
    pub target_duration: f64,
    pub aspect_ratio: AspectRatio,
    pub constraints: DirectorConstraints,
}

/// Tunables for the planning model call.
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 8192,
        }
    }
}

/// Shot-plan synthesis over a text completion adapter.
///
/// The director never retries: validation failures go back to the caller,
/// and provider errors bubble with their retryable classification intact.
pub struct Director {
    text: Arc<dyn TextCompletion>,
    config: DirectorConfig,
}

impl Director {
    pub fn new(text: Arc<dyn TextCompletion>) -> Self {
        Self {
            text,
            config: DirectorConfig::default(),
        }
    }

    pub fn with_config(text: Arc<dyn TextCompletion>, config: DirectorConfig) -> Self {
        Self { text, config }
    }

    /// Produce a validated plan for a concept.
    pub async fn direct(&self, request: &DirectionRequest) -> DirectorResult<Plan> {
        let system = prompts::system_prompt();
        let user = prompts::direction_prompt(
            &request.concept,
            request.style.as_deref(),
            request.target_duration,
            request.aspect_ratio,
            &request.constraints,
        );

        let plan = self
            .invoke(&system, &user, request.target_duration, &request.constraints)
            .await?;

        info!(
            scenes = plan.scenes.len(),
            shots = plan.shot_count(),
            total = plan.total_duration,
            "directed plan"
        );
        Ok(plan)
    }

    /// Revise an existing plan according to feedback.
    ///
    /// The prior plan's total is the duration target, so feedback-driven
    /// re-pacing stays within ±10% of what the user already saw.
    pub async fn refine(&self, plan: &Plan, feedback: &str) -> DirectorResult<Plan> {
        let system = prompts::system_prompt();
        let user = prompts::refine_prompt(plan, feedback);

        let refined = self
            .invoke(
                &system,
                &user,
                plan.total_duration,
                &DirectorConstraints::default(),
            )
            .await?;

        info!(
            shots = refined.shot_count(),
            total = refined.total_duration,
            "refined plan"
        );
        Ok(refined)
    }

    /// Upfront cost disclosure for running a plan through a bundle.
    pub fn estimate_cost(
        &self,
        plan: &Plan,
        bundle: &ProviderBundle,
        aspect_ratio: AspectRatio,
    ) -> CostBreakdown {
        bundle.estimate(plan, aspect_ratio)
    }

    async fn invoke(
        &self,
        system: &str,
        user: &str,
        target_duration: f64,
        constraints: &DirectorConstraints,
    ) -> DirectorResult<Plan> {
        let options = ChatOptions {
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            json_output: true,
        };

        let outcome = self.text.chat(system, user, &options).await?;
        debug!(
            input_tokens = ?outcome.input_tokens,
            output_tokens = ?outcome.output_tokens,
            "planner responded"
        );

        let raw = parse_raw_plan(&outcome.content)?;
        let mut plan = validate_plan(raw, target_duration, constraints)?;
        normalize_plan(&mut plan);
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reelgen_models::{CameraMove, Scene, Shot, Transition};
    use reelgen_providers::{ChatOutcome, ProviderError, ProviderResult};

    struct ScriptedText {
        content: String,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl TextCompletion for ScriptedText {
        async fn chat(
            &self,
            _system: &str,
            _user: &str,
            options: &ChatOptions,
        ) -> ProviderResult<ChatOutcome> {
            assert!(options.json_output);
            if let Some(status) = self.fail_with {
                return Err(ProviderError::http(status, "scripted failure"));
            }
            Ok(ChatOutcome {
                content: self.content.clone(),
                input_tokens: Some(1800),
                output_tokens: Some(2200),
            })
        }

        fn estimate_cost(&self, _input: u64, _output: u64) -> f64 {
            0.0
        }
    }

    fn prompt() -> String {
        vec!["word"; 21].join(" ")
    }

    fn valid_plan(durations: &[f64]) -> Plan {
        Plan {
            title: "Dawn Ascent".into(),
            narrative: "a drone rises over a pine forest at dawn".into(),
            total_duration: durations.iter().sum(),
            scenes: vec![Scene {
                id: 1,
                name: "ascent".into(),
                description: "over the trees".into(),
                mood: "serene".into(),
                shots: durations
                    .iter()
                    .enumerate()
                    .map(|(i, d)| Shot {
                        id: i as u32 + 1,
                        duration: *d,
                        start_prompt: prompt(),
                        end_prompt: prompt(),
                        motion_prompt: prompt(),
                        camera_move: CameraMove::CraneUp,
                        lighting: "golden dawn light".into(),
                        color_palette: None,
                        transition_out: Transition::Cut,
                    })
                    .collect(),
            }],
        }
    }

    fn request(target: f64) -> DirectionRequest {
        DirectionRequest {
            concept: "A drone ascent over a pine forest at dawn".into(),
            style: None,
            target_duration: target,
            aspect_ratio: AspectRatio::Wide,
            constraints: DirectorConstraints::default(),
        }
    }

    fn director_with(content: String) -> Director {
        Director::new(Arc::new(ScriptedText {
            content,
            fail_with: None,
        }))
    }

    #[tokio::test]
    async fn test_direct_happy_path() {
        let plan_json = serde_json::to_string(&valid_plan(&[7.5, 7.5, 7.5, 7.5])).unwrap();
        let director = director_with(format!("```json\n{}\n```", plan_json));

        let plan = director.direct(&request(30.0)).await.unwrap();
        assert!(plan.total_duration >= 27.0 && plan.total_duration <= 33.0);
        assert_eq!(plan.shot_count(), 4);
    }

    #[tokio::test]
    async fn test_direct_rejects_out_of_tolerance_total() {
        // 70s of shots against a 60s target.
        let plan_json = serde_json::to_string(&valid_plan(&[10.0; 7])).unwrap();
        let director = director_with(plan_json);

        let err = director.direct(&request(60.0)).await.unwrap_err();
        match err {
            crate::DirectorError::Validation(v) => {
                assert_eq!(v.kind, crate::ValidationErrorKind::TotalDuration)
            }
            other => panic!("expected validation error, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_refine_validates_against_prior_total() {
        let prior = valid_plan(&[7.5, 7.5, 7.5, 7.5]); // 30s
        // The refined plan drifts to 32.4s: within ±10% of 30.
        let refined_json = serde_json::to_string(&valid_plan(&[8.1, 8.1, 8.1, 8.1])).unwrap();
        let director = director_with(refined_json);

        let refined = director.refine(&prior, "make it breathe a little").await.unwrap();
        assert_eq!(refined.total_duration, 32.4);
    }

    #[tokio::test]
    async fn test_provider_error_bubbles_unchanged() {
        let director = Director::new(Arc::new(ScriptedText {
            content: String::new(),
            fail_with: Some(503),
        }));

        let err = director.direct(&request(30.0)).await.unwrap_err();
        match err {
            crate::DirectorError::Provider(p) => assert!(p.is_retryable()),
            other => panic!("expected provider error, got {}", other),
        }
    }
}
