//! Typed outcome of one render attempt.

use serde::{Deserialize, Serialize};

/// Exit code when the script could not be written to the working area.
pub const EXIT_SCRIPT_WRITE_FAILED: i32 = -1;
/// Exit code when the renderer was killed at the deadline.
pub const EXIT_TIMED_OUT: i32 = -2;
/// Exit code when the renderer executable does not exist.
pub const EXIT_TOOL_MISSING: i32 = -3;
/// Exit code for any other fault, including termination by signal.
pub const EXIT_INTERNAL: i32 = -4;

/// Diagnostic for a zero exit that left no media file behind.
pub const ARTIFACT_MISSING_DIAGNOSTIC: &str = "artifact not found after successful exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Rendered,
    ToolFailed,
    ArtifactMissing,
    TimedOut,
    ToolMissing,
    ScriptWriteFailed,
    Internal,
}

/// What the sandbox reports for every attempt. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Final location of the rendered video, set only on success.
    pub artifact_path: Option<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub outcome: ExecutionOutcome,
}

impl ExecutionResult {
    #[must_use]
    pub fn rendered(artifact_path: impl Into<String>, stdout: String, stderr: String) -> Self {
        Self {
            success: true,
            artifact_path: Some(artifact_path.into()),
            stdout,
            stderr,
            exit_code: 0,
            outcome: ExecutionOutcome::Rendered,
        }
    }

    /// Failed attempt with a diagnostic in `stderr`.
    #[must_use]
    pub fn failed(outcome: ExecutionOutcome, exit_code: i32, stdout: String, stderr: String) -> Self {
        Self {
            success: false,
            artifact_path: None,
            stdout,
            stderr,
            exit_code,
            outcome,
        }
    }

    /// Failure synthesized by the sandbox itself, with no process output.
    #[must_use]
    pub fn synthetic(outcome: ExecutionOutcome, exit_code: i32, diagnostic: impl Into<String>) -> Self {
        Self::failed(outcome, exit_code, String::new(), diagnostic.into())
    }

    /// Text handed to the repairer: stderr, or stdout when stderr is empty.
    #[must_use]
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_is_success() {
        let result = ExecutionResult::rendered("storage/outputs/output.mp4", String::new(), String::new());
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.outcome, ExecutionOutcome::Rendered);
    }

    #[test]
    fn test_diagnostics_prefers_stderr() {
        let result = ExecutionResult::failed(
            ExecutionOutcome::ToolFailed,
            1,
            "progress".into(),
            "Traceback".into(),
        );
        assert_eq!(result.diagnostics(), "Traceback");

        let quiet = ExecutionResult::failed(ExecutionOutcome::ToolFailed, 1, "only stdout".into(), " ".into());
        assert_eq!(quiet.diagnostics(), "only stdout");
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&ExecutionOutcome::ArtifactMissing).unwrap();
        assert_eq!(json, "\"artifact_missing\"");
    }
}
