//! Instruction builders for each stage.
//!
//! Templates use `{name}` placeholders filled by [`render`]. The exact wording
//! is free to change; the JSON shapes they request are what the validators
//! check.

const REASONER_TEMPLATE: &str = r#"You are a mathematics teacher planning an animated explanation.
Break the request below into a short sequence of logical steps that can be shown visually.

Request: {request}

Respond with ONLY valid JSON in exactly this shape:
{
  "concept": "short name of the concept",
  "steps": ["step 1", "step 2", "step 3"]
}

Rules:
- 3 to 5 steps, one or two sentences each
- Favour geometric and visual intuition
- No markdown and no commentary, only the JSON object"#;

const PLANNER_TEMPLATE: &str = r#"You are an animation director. Turn the reasoning below into a scene plan.

Reasoning:
{reasoning}

Respond with ONLY valid JSON in exactly this shape:
{
  "scenes": [
    {
      "title": "Scene title",
      "objects": ["Axes", "Dot"],
      "animations": ["Create", "FadeIn"]
    }
  ]
}

Rules:
- 2 to 4 scenes
- Use Manim object names (Text, MathTex, Axes, Circle, Line, Dot, ...)
- Use Manim animation names (Create, Write, FadeIn, FadeOut, Transform, ...)
- Every scene needs at least one object and one animation"#;

const CODER_TEMPLATE: &str = r#"You write Manim Community Edition scripts. Implement the scene plan below as one runnable script.

Scene plan:
{manifest}

The script must follow this skeleton:

```python
{import_marker} *

class {class_name}(Scene):
    def {method_name}(self):
        ...
```

Rules:
- Manim Community Edition syntax only
- The class must be named {class_name}
- Put self.wait() between scenes
- Use Create() for shapes and Write() for text; ShowCreation does not exist
- Use .animate for property changes, e.g. dot.animate.shift(UP)
- No dependencies beyond manim
- Return ONLY the Python code"#;

const REPAIRER_TEMPLATE: &str = r#"You debug Manim Community Edition scripts. The script below failed when rendered.

Script:
```python
{script}
```

Renderer output:
```
{diagnostics}
```

Rules:
- Make the smallest change that fixes this error
- Keep the class name, structure and animation order
- Return ONLY the complete corrected Python script"#;

const NARRATOR_TEMPLATE: &str = r#"You write voice-over narration for an animated maths explanation.

Reasoning:
{reasoning}

Scene plan:
{manifest}

Respond with ONLY valid JSON in exactly this shape:
{
  "narrations": [
    {"scene_index": 0, "text": "What the narrator says", "duration": 4}
  ]
}

Rules:
- Exactly one narration per scene, in scene order
- duration is the speaking time in seconds
- Plain conversational sentences, no markdown"#;

/// Appended after a validation failure, one per stage.
pub const REASONER_CORRECTION: &str = "IMPORTANT: Return ONLY valid JSON with a non-empty \"concept\" string and a non-empty \"steps\" list. No additional text.";

pub const PLANNER_CORRECTION: &str = "IMPORTANT: Return ONLY valid JSON with a non-empty \"scenes\" list; every scene needs \"title\", \"objects\" and \"animations\".";

pub const CODER_CORRECTION: &str = "CRITICAL: The code MUST include 'from manim import *' and 'class GeneratedScene(Scene)' with a 'def construct(self)' method. Return ONLY the Python code.";

pub const REPAIRER_CORRECTION: &str =
    "IMPORTANT: Make ONLY minimal changes to fix the specific error. Do not redesign.";

pub const NARRATOR_CORRECTION: &str =
    "IMPORTANT: Return ONLY valid JSON with a \"narrations\" list of {\"scene_index\", \"text\", \"duration\"} objects.";

/// Replace each `{key}` in `template` with its value.
#[must_use]
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

pub(crate) fn reasoner(request: &str) -> String {
    render(REASONER_TEMPLATE, &[("request", request.trim())])
}

pub(crate) fn planner(reasoning_json: &str) -> String {
    render(PLANNER_TEMPLATE, &[("reasoning", reasoning_json)])
}

pub(crate) fn coder(
    manifest_json: &str,
    entry: &crate::model::EntryPoint,
) -> String {
    render(
        CODER_TEMPLATE,
        &[
            ("manifest", manifest_json),
            ("import_marker", entry.import_marker),
            ("class_name", entry.class_name),
            ("method_name", entry.method_name),
        ],
    )
}

pub(crate) fn repairer(script: &str, diagnostics: &str) -> String {
    render(
        REPAIRER_TEMPLATE,
        &[("script", script), ("diagnostics", diagnostics.trim())],
    )
}

pub(crate) fn narrator(reasoning_json: &str, manifest_json: &str) -> String {
    render(
        NARRATOR_TEMPLATE,
        &[("reasoning", reasoning_json), ("manifest", manifest_json)],
    )
}
