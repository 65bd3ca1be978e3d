//! [`ReasoningOutput`] → [`SceneManifest`].

use scenesmith_utils::types::StageId;

use crate::extraction::extract_json;
use crate::model::{ReasoningOutput, SceneManifest};
use crate::prompts;
use crate::stage::Stage;
use crate::validation::{Validation, ValidationRules, validate_manifest};

use super::to_json;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerStage {
    rules: ValidationRules,
}

impl PlannerStage {
    #[must_use]
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }
}

impl Stage for PlannerStage {
    type Input = ReasoningOutput;
    type Output = SceneManifest;

    fn id(&self) -> StageId {
        StageId::Planner
    }

    fn prompt(&self, reasoning: &ReasoningOutput) -> String {
        prompts::planner(&to_json(reasoning))
    }

    fn correction(&self) -> &'static str {
        prompts::PLANNER_CORRECTION
    }

    fn extract(&self, raw: &str) -> String {
        raw.trim().to_string()
    }

    fn validate(&self, payload: &str) -> Validation<SceneManifest> {
        match extract_json(payload) {
            Ok(value) => validate_manifest(&value, self.rules),
            Err(reason) => Validation::Invalid(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_reasoning_json() {
        let reasoning = ReasoningOutput {
            concept: "Pythagoras".into(),
            steps: vec!["square the legs".into()],
        };
        let prompt = PlannerStage::default().prompt(&reasoning);
        assert!(prompt.contains("\"concept\": \"Pythagoras\""));
        assert!(prompt.contains("square the legs"));
    }

    #[test]
    fn test_empty_scenes_rejected() {
        assert_eq!(
            PlannerStage::default().validate(r#"{"scenes": []}"#),
            Validation::Invalid("'scenes' cannot be empty".to_string())
        );
    }

    #[test]
    fn test_strict_rules_reject_empty_members() {
        let strict = PlannerStage::new(ValidationRules {
            require_scene_members: true,
            syntax_check: true,
        });
        let payload = r#"{"scenes": [{"title": "t", "objects": [], "animations": ["Create"]}]}"#;
        assert!(PlannerStage::default().validate(payload).is_valid());
        assert_eq!(
            strict.validate(payload),
            Validation::Invalid("Scene 0 'objects' cannot be empty".to_string())
        );
    }
}
