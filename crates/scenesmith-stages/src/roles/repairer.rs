//! Failed script + renderer diagnostics → patched script.
//!
//! Unlike the upstream stages the repairer never aborts the pipeline. It
//! reports what it managed and lets the repair loop decide.

use async_trait::async_trait;
use tracing::{debug, info};

use scenesmith_llm::LlmError;
use scenesmith_utils::types::StageId;

use crate::extraction::extract_code;
use crate::model::EntryPoint;
use crate::prompts;
use crate::stage::{AttemptFailure, Stage, StageOutcome};
use crate::validation::{Validation, ValidationRules, validate_script};

/// Script and diagnostics handed to the repairer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairRequest {
    pub script: String,
    pub diagnostics: String,
}

impl RepairRequest {
    pub fn new(script: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            diagnostics: diagnostics.into(),
        }
    }
}

/// What a repair attempt produced.
#[derive(Debug, Clone)]
pub enum RepairOutcome {
    /// A candidate that passed validation.
    Repaired(String),
    /// Attempts ran out on validation; the last candidate is returned anyway.
    BestEffort { script: String, reason: String },
    /// The provider failed on the last attempt. `original` is the unchanged
    /// input script.
    ProviderFailed { original: String, error: LlmError },
}

impl RepairOutcome {
    /// Script to execute next.
    #[must_use]
    pub fn script(&self) -> &str {
        match self {
            Self::Repaired(script) | Self::BestEffort { script, .. } => script,
            Self::ProviderFailed { original, .. } => original,
        }
    }

    /// A provider fault the repair loop treats as fatal.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::ProviderFailed { .. })
    }

    pub(crate) fn from_stage(outcome: StageOutcome<String>, request: &RepairRequest) -> Self {
        let outcome = match outcome {
            StageOutcome::Valid { value, .. } => Self::Repaired(value),
            StageOutcome::Exhausted {
                failure: AttemptFailure::Provider(error),
                ..
            } => Self::ProviderFailed {
                original: request.script.clone(),
                error,
            },
            StageOutcome::Exhausted {
                failure: AttemptFailure::Invalid(reason),
                last_payload,
                ..
            } => Self::BestEffort {
                script: last_payload.unwrap_or_else(|| request.script.clone()),
                reason,
            },
        };

        let changed = outcome.script() != request.script;
        info!(changed = changed, best_effort = matches!(outcome, Self::BestEffort { .. }), "Repair finished");
        outcome
    }
}

/// Seam between the repair loop and whatever produces patched scripts.
#[async_trait]
pub trait ScriptRepairer: Send + Sync {
    async fn repair(&self, script: &str, diagnostics: &str) -> RepairOutcome;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RepairerStage {
    entry: EntryPoint,
    rules: ValidationRules,
}

impl RepairerStage {
    #[must_use]
    pub fn new(entry: EntryPoint, rules: ValidationRules) -> Self {
        Self { entry, rules }
    }
}

impl Stage for RepairerStage {
    type Input = RepairRequest;
    type Output = String;

    fn id(&self) -> StageId {
        StageId::Repairer
    }

    fn prompt(&self, request: &RepairRequest) -> String {
        debug!(diagnostic_chars = request.diagnostics.len(), "Building repair instruction");
        prompts::repairer(&request.script, &request.diagnostics)
    }

    fn correction(&self) -> &'static str {
        prompts::REPAIRER_CORRECTION
    }

    fn extract(&self, raw: &str) -> String {
        extract_code(raw)
    }

    fn validate(&self, payload: &str) -> Validation<String> {
        validate_script(payload, &self.entry, self.rules)
    }
}
