//! Request → [`ReasoningOutput`].

use scenesmith_utils::types::StageId;

use crate::extraction::extract_json;
use crate::model::ReasoningOutput;
use crate::prompts;
use crate::stage::Stage;
use crate::validation::{Validation, validate_reasoning};

/// Breaks a free-form request into a concept and a list of steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReasonerStage;

impl Stage for ReasonerStage {
    type Input = str;
    type Output = ReasoningOutput;

    fn id(&self) -> StageId {
        StageId::Reasoner
    }

    fn prompt(&self, request: &str) -> String {
        prompts::reasoner(request)
    }

    fn correction(&self) -> &'static str {
        prompts::REASONER_CORRECTION
    }

    fn extract(&self, raw: &str) -> String {
        raw.trim().to_string()
    }

    fn validate(&self, payload: &str) -> Validation<ReasoningOutput> {
        match extract_json(payload) {
            Ok(value) => validate_reasoning(&value),
            Err(reason) => Validation::Invalid(reason),
        }
    }
}
