//! [`SceneManifest`] → script text.

use scenesmith_utils::types::StageId;

use crate::extraction::extract_code;
use crate::model::{EntryPoint, SceneManifest};
use crate::prompts;
use crate::stage::Stage;
use crate::validation::{Validation, ValidationRules, validate_script};

use super::to_json;

#[derive(Debug, Clone, Copy, Default)]
pub struct CoderStage {
    entry: EntryPoint,
    rules: ValidationRules,
}

impl CoderStage {
    #[must_use]
    pub fn new(entry: EntryPoint, rules: ValidationRules) -> Self {
        Self { entry, rules }
    }

    #[must_use]
    pub fn entry(&self) -> &EntryPoint {
        &self.entry
    }
}

impl Stage for CoderStage {
    type Input = SceneManifest;
    type Output = String;

    fn id(&self) -> StageId {
        StageId::Coder
    }

    fn prompt(&self, manifest: &SceneManifest) -> String {
        prompts::coder(&to_json(manifest), &self.entry)
    }

    fn correction(&self) -> &'static str {
        prompts::CODER_CORRECTION
    }

    fn extract(&self, raw: &str) -> String {
        extract_code(raw)
    }

    fn validate(&self, payload: &str) -> Validation<String> {
        validate_script(payload, &self.entry, self.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenesmith_utils::test_support::valid_scene_script;

    #[test]
    fn test_fenced_script_accepted() {
        let raw = format!("Here is the code:\n```python\n{}\n```", valid_scene_script());
        let coder = CoderStage::default();
        match coder.validate(&coder.extract(&raw)) {
            Validation::Valid(code) => assert!(code.starts_with("from manim import")),
            Validation::Invalid(reason) => panic!("Expected valid script, got {reason}"),
        }
    }

    #[test]
    fn test_missing_entry_class_rejected() {
        let code = "from manim import *\n\nclass Other(Scene):\n    def construct(self):\n        pass\n";
        assert_eq!(
            CoderStage::default().validate(code),
            Validation::Invalid("Missing GeneratedScene class definition".to_string())
        );
    }

    #[test]
    fn test_syntax_check_can_be_disabled() {
        let code = "from manim import *\nclass GeneratedScene(Scene):\n    def construct(self)\n        pass\n";
        let lenient = CoderStage::new(
            EntryPoint::MANIM,
            ValidationRules {
                require_scene_members: false,
                syntax_check: false,
            },
        );
        assert!(!CoderStage::default().validate(code).is_valid());
        assert!(lenient.validate(code).is_valid());
    }
}
