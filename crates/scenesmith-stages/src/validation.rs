//! Pure schema checks for every stage output.
//!
//! Each validator is a function of its input only and returns
//! [`Validation::Valid`] with the typed value or [`Validation::Invalid`] with
//! a one-line reason that is fed back to the model.

use serde_json::Value;

use crate::model::{EntryPoint, Narration, NarrationSet, ReasoningOutput, Scene, SceneManifest};
use crate::syntax;

/// Outcome of checking one candidate payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Valid(T),
    Invalid(String),
}

impl<T> Validation<T> {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(reason) => Err(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Validation<U> {
        match self {
            Self::Valid(value) => Validation::Valid(f(value)),
            Self::Invalid(reason) => Validation::Invalid(reason),
        }
    }
}

impl<T> From<Result<T, String>> for Validation<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(value) => Self::Valid(value),
            Err(reason) => Self::Invalid(reason),
        }
    }
}

/// Knobs for the manifest and script checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    /// Reject scenes whose `objects` or `animations` are empty.
    pub require_scene_members: bool,
    /// Parse scripts and reject syntax errors.
    pub syntax_check: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            require_scene_members: false,
            syntax_check: true,
        }
    }
}

impl From<&scenesmith_config::ValidationSettings> for ValidationRules {
    fn from(settings: &scenesmith_config::ValidationSettings) -> Self {
        Self {
            require_scene_members: settings.require_scene_members,
            syntax_check: settings.syntax_check,
        }
    }
}

fn as_object(value: &Value) -> Result<&serde_json::Map<String, Value>, String> {
    value
        .as_object()
        .ok_or_else(|| "Expected a JSON object".to_string())
}

fn string_list(value: &Value, what: &str) -> Result<Vec<String>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("{what} must be a list"))?;
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(format!("{what} must contain only strings")),
        })
        .collect()
}

/// Reasoner output: non-empty `concept`, non-empty `steps` list.
#[must_use]
pub fn validate_reasoning(value: &Value) -> Validation<ReasoningOutput> {
    let check = || -> Result<ReasoningOutput, String> {
        let obj = as_object(value)?;
        let concept = obj.get("concept").ok_or("Missing 'concept' field")?;
        let steps = obj.get("steps").ok_or("Missing 'steps' field")?;

        let concept = concept
            .as_str()
            .ok_or("'concept' must be a string")?
            .trim()
            .to_string();
        let steps = string_list(steps, "'steps'")?;

        let output = ReasoningOutput { concept, steps };
        check_reasoning(&output)?;
        Ok(output)
    };
    check().into()
}

/// Re-check an already typed reasoning value.
pub fn check_reasoning(output: &ReasoningOutput) -> Result<(), String> {
    if output.concept.trim().is_empty() {
        return Err("'concept' cannot be empty".to_string());
    }
    if output.steps.is_empty() {
        return Err("'steps' cannot be empty".to_string());
    }
    Ok(())
}

/// Planner output: non-empty `scenes`, each with `title`, `objects` and
/// `animations` present.
#[must_use]
pub fn validate_manifest(value: &Value, rules: ValidationRules) -> Validation<SceneManifest> {
    let check = || -> Result<SceneManifest, String> {
        let obj = as_object(value)?;
        let scenes = obj.get("scenes").ok_or("Missing 'scenes' field")?;
        let scenes = scenes.as_array().ok_or("'scenes' must be a list")?;

        let mut parsed = Vec::with_capacity(scenes.len());
        for (i, scene) in scenes.iter().enumerate() {
            let scene = scene
                .as_object()
                .ok_or_else(|| format!("Scene {i} must be an object"))?;
            let title = scene
                .get("title")
                .ok_or_else(|| format!("Scene {i} missing 'title'"))?;
            let objects = scene
                .get("objects")
                .ok_or_else(|| format!("Scene {i} missing 'objects'"))?;
            let animations = scene
                .get("animations")
                .ok_or_else(|| format!("Scene {i} missing 'animations'"))?;

            let title = match title {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            parsed.push(Scene {
                title,
                objects: string_list(objects, &format!("Scene {i} 'objects'"))?,
                animations: string_list(animations, &format!("Scene {i} 'animations'"))?,
            });
        }

        let manifest = SceneManifest { scenes: parsed };
        check_manifest(&manifest, rules)?;
        Ok(manifest)
    };
    check().into()
}

/// Re-check an already typed manifest.
pub fn check_manifest(manifest: &SceneManifest, rules: ValidationRules) -> Result<(), String> {
    if manifest.scenes.is_empty() {
        return Err("'scenes' cannot be empty".to_string());
    }
    if rules.require_scene_members {
        for (i, scene) in manifest.scenes.iter().enumerate() {
            if scene.objects.is_empty() {
                return Err(format!("Scene {i} 'objects' cannot be empty"));
            }
            if scene.animations.is_empty() {
                return Err(format!("Scene {i} 'animations' cannot be empty"));
            }
        }
    }
    Ok(())
}

/// Coder and Repairer output: import marker, entry-point class, init method,
/// and (optionally) a clean parse.
#[must_use]
pub fn validate_script(code: &str, entry: &EntryPoint, rules: ValidationRules) -> Validation<String> {
    check_script(code, entry, rules)
        .map(|()| code.to_string())
        .into()
}

pub fn check_script(code: &str, entry: &EntryPoint, rules: ValidationRules) -> Result<(), String> {
    if code.trim().is_empty() {
        return Err("Generated code is empty".to_string());
    }
    if !code.contains(entry.import_marker) {
        return Err(format!("Missing '{}' import statement", entry.import_marker));
    }
    if !code.contains(&entry.class_marker()) {
        return Err(format!("Missing {} class definition", entry.class_name));
    }
    if !code.contains(&entry.method_marker()) {
        return Err(format!("Missing {}() method", entry.method_name));
    }
    if rules.syntax_check {
        syntax::check_python(code)?;
    }
    Ok(())
}

/// Narrator output: a `narrations` list of `{scene_index, text, duration}`.
#[must_use]
pub fn validate_narration(value: &Value) -> Validation<NarrationSet> {
    let check = || -> Result<NarrationSet, String> {
        let obj = as_object(value)?;
        let narrations = obj
            .get("narrations")
            .ok_or("Missing 'narrations' field")?
            .as_array()
            .ok_or("'narrations' must be a list")?;

        let mut parsed = Vec::with_capacity(narrations.len());
        for (i, item) in narrations.iter().enumerate() {
            let item = item
                .as_object()
                .ok_or_else(|| format!("Narration {i} must be an object"))?;
            let text = item
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| format!("Narration {i} missing 'text'"))?;
            let scene_index = item
                .get("scene_index")
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(i);
            let duration = item.get("duration").and_then(Value::as_f64).unwrap_or(0.0);
            parsed.push(Narration {
                scene_index,
                text: text.to_string(),
                duration,
            });
        }
        Ok(NarrationSet { narrations: parsed })
    };
    check().into()
}

/// Compare a narration set against the scenes it should cover. Returns a
/// one-line note when counts differ or a scene index is out of range.
pub fn narration_coverage(set: &NarrationSet, manifest: &SceneManifest) -> Option<String> {
    let scenes = manifest.scenes.len();
    if set.narrations.len() != scenes {
        return Some(format!(
            "{} narration(s) for {scenes} scene(s)",
            set.narrations.len()
        ));
    }
    set.narrations
        .iter()
        .find(|n| n.scene_index >= scenes)
        .map(|n| format!("scene_index {} out of range for {scenes} scene(s)", n.scene_index))
}
