//! Reasoning + manifest → one narration line per scene.

use scenesmith_utils::types::StageId;

use crate::extraction::extract_json;
use crate::model::{NarrationSet, ReasoningOutput, SceneManifest};
use crate::prompts;
use crate::stage::Stage;
use crate::validation::{Validation, validate_narration};

use super::to_json;

/// Upstream values the narrator reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationContext {
    pub reasoning: ReasoningOutput,
    pub manifest: SceneManifest,
}

/// Narration plus whether it was synthesized locally.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationOutcome {
    pub narration: NarrationSet,
    pub fallback: bool,
    pub attempts: u32,
    /// Set when a valid narration does not line up with the scenes.
    pub mismatch: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NarratorStage;

impl Stage for NarratorStage {
    type Input = NarrationContext;
    type Output = NarrationSet;

    fn id(&self) -> StageId {
        StageId::Narrator
    }

    fn prompt(&self, ctx: &NarrationContext) -> String {
        prompts::narrator(&to_json(&ctx.reasoning), &to_json(&ctx.manifest))
    }

    fn correction(&self) -> &'static str {
        prompts::NARRATOR_CORRECTION
    }

    fn extract(&self, raw: &str) -> String {
        raw.trim().to_string()
    }

    fn validate(&self, payload: &str) -> Validation<NarrationSet> {
        match extract_json(payload) {
            Ok(value) => validate_narration(&value),
            Err(reason) => Validation::Invalid(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narration_parsed_with_defaults() {
        let payload = r#"{"narrations": [{"text": "Meet the circle"}, {"scene_index": 1, "text": "Now it grows", "duration": 4.5}]}"#;
        match NarratorStage.validate(payload) {
            Validation::Valid(set) => {
                assert_eq!(set.narrations.len(), 2);
                assert_eq!(set.narrations[0].scene_index, 0);
                assert_eq!(set.narrations[0].duration, 0.0);
                assert_eq!(set.narrations[1].duration, 4.5);
            }
            Validation::Invalid(reason) => panic!("Expected valid narration, got {reason}"),
        }
    }

    #[test]
    fn test_missing_field_rejected() {
        assert_eq!(
            NarratorStage.validate(r#"{"lines": []}"#),
            Validation::Invalid("Missing 'narrations' field".to_string())
        );
    }
}
