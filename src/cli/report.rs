//! Rendering a pipeline result for the terminal.

use std::fmt::Write as _;

use crate::PipelineResult;
use crate::utils::redaction::redact_secrets;

/// Short human summary. Goes to stdout on success, stderr on failure.
pub(crate) fn human(result: &PipelineResult) -> String {
    let mut out = String::new();
    let stages = &result.session_log.stages;

    if let Some(reasoning) = &stages.reasoning {
        let _ = writeln!(out, "✓ Concept: {} ({} steps)", reasoning.concept, reasoning.steps.len());
    }
    if let Some(manifest) = &stages.scene_manifest {
        let _ = writeln!(out, "✓ Scenes: {}", manifest.scenes.len());
    }
    if let Some(narration) = &stages.narration {
        let note = if narration.fallback { " (fallback)" } else { "" };
        let _ = writeln!(out, "✓ Narration: {} line(s){note}", narration.set.narrations.len());
    }
    if let Some(path) = &result.script_path {
        let _ = writeln!(out, "✓ Script: {path}");
    }
    if let Some(execution) = &stages.execution {
        let mark = if execution.success { "✓" } else { "✗" };
        let _ = writeln!(out, "{mark} Render attempts: {}", execution.attempts);
    }
    if let Some(path) = &result.artifact_path {
        let _ = writeln!(out, "✓ Video: {path}");
    }

    if result.success {
        let _ = writeln!(out, "Completed in {:.2}s", result.duration_seconds);
    } else {
        let message = result.error_message.as_deref().unwrap_or("unknown error");
        let _ = writeln!(out, "✗ Pipeline failed: {message}");
        if !result.suggestions.is_empty() {
            let _ = writeln!(out, "\nSuggestions:");
            for suggestion in &result.suggestions {
                let _ = writeln!(out, "  • {suggestion}");
            }
        }
    }

    redact_secrets(&out)
}

pub(crate) fn json(result: &PipelineResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result).map(|s| redact_secrets(&s))
}
