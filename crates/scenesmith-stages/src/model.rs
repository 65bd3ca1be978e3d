//! Typed stage outputs.

use serde::{Deserialize, Serialize};

/// Structured breakdown of the requested concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningOutput {
    pub concept: String,
    pub steps: Vec<String>,
}

/// Ordered list of scenes to animate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneManifest {
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub title: String,
    pub objects: Vec<String>,
    pub animations: Vec<String>,
}

/// One narration line per scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationSet {
    pub narrations: Vec<Narration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narration {
    pub scene_index: usize,
    pub text: String,
    /// Seconds.
    pub duration: f64,
}

/// Seconds assigned to each synthesized narration line.
pub const FALLBACK_NARRATION_SECONDS: f64 = 3.0;

impl NarrationSet {
    /// Deterministic narration derived from the manifest alone: each scene's
    /// title, shown for [`FALLBACK_NARRATION_SECONDS`].
    #[must_use]
    pub fn fallback_for(manifest: &SceneManifest) -> Self {
        Self {
            narrations: manifest
                .scenes
                .iter()
                .enumerate()
                .map(|(scene_index, scene)| Narration {
                    scene_index,
                    text: scene.title.clone(),
                    duration: FALLBACK_NARRATION_SECONDS,
                })
                .collect(),
        }
    }
}

/// Markers a generated script must contain to be runnable by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    /// Framework import line prefix
    pub import_marker: &'static str,
    /// Scene class the renderer is told to render
    pub class_name: &'static str,
    /// Method the renderer calls on that class
    pub method_name: &'static str,
}

impl EntryPoint {
    pub const MANIM: Self = Self {
        import_marker: "from manim import",
        class_name: "GeneratedScene",
        method_name: "construct",
    };

    /// Text that declares the entry-point class.
    #[must_use]
    pub fn class_marker(&self) -> String {
        format!("class {}", self.class_name)
    }

    /// Text that declares the initialization method.
    #[must_use]
    pub fn method_marker(&self) -> String {
        format!("def {}", self.method_name)
    }
}

impl Default for EntryPoint {
    fn default() -> Self {
        Self::MANIM
    }
}
