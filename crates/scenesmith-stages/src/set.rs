//! All five roles bound to one backend and one configuration.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use scenesmith_config::{Config, StagePolicy};
use scenesmith_llm::LlmBackend;
use scenesmith_utils::error::StageError;
use scenesmith_utils::types::StageId;

use crate::model::{EntryPoint, NarrationSet, ReasoningOutput, SceneManifest};
use crate::roles::{
    CoderStage, NarrationContext, NarrationOutcome, NarratorStage, PlannerStage, ReasonerStage,
    RepairOutcome, RepairRequest, RepairerStage, ScriptRepairer,
};
use crate::stage::{StageOutcome, StageRunner};
use crate::validation::{ValidationRules, narration_coverage};

/// Entry point for running stages from the orchestrator.
#[derive(Clone)]
pub struct StageSet {
    backend: Arc<dyn LlmBackend>,
    policies: BTreeMap<StageId, StagePolicy>,
    timeout: Duration,
    model_label: String,
    entry: EntryPoint,
    rules: ValidationRules,
}

impl StageSet {
    #[must_use]
    pub fn from_config(backend: Arc<dyn LlmBackend>, config: &Config) -> Self {
        use strum::IntoEnumIterator;

        let policies = StageId::iter()
            .map(|stage| (stage, config.stage_policy(stage)))
            .collect();

        Self {
            backend,
            policies,
            timeout: Duration::from_secs(config.llm.request_timeout_secs),
            model_label: config.llm.models.first().cloned().unwrap_or_default(),
            entry: EntryPoint::MANIM,
            rules: ValidationRules::from(&config.validation),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, stage: StageId, policy: StagePolicy) -> Self {
        self.policies.insert(stage, policy);
        self
    }

    #[must_use]
    pub fn policy(&self, stage: StageId) -> StagePolicy {
        self.policies
            .get(&stage)
            .copied()
            .unwrap_or_else(|| StagePolicy::default_for(stage))
    }

    #[must_use]
    pub fn entry(&self) -> &EntryPoint {
        &self.entry
    }

    fn runner(&self) -> StageRunner<'_> {
        StageRunner::new(self.backend.as_ref(), self.timeout).with_model_label(&self.model_label)
    }

    pub async fn reason(&self, request: &str) -> Result<ReasoningOutput, StageError> {
        self.runner()
            .run(&ReasonerStage, request, self.policy(StageId::Reasoner))
            .await
            .into_result(StageId::Reasoner)
    }

    pub async fn plan(&self, reasoning: &ReasoningOutput) -> Result<SceneManifest, StageError> {
        let stage = PlannerStage::new(self.rules);
        self.runner()
            .run(&stage, reasoning, self.policy(StageId::Planner))
            .await
            .into_result(StageId::Planner)
    }

    pub async fn code(&self, manifest: &SceneManifest) -> Result<String, StageError> {
        let stage = CoderStage::new(self.entry, self.rules);
        self.runner()
            .run(&stage, manifest, self.policy(StageId::Coder))
            .await
            .into_result(StageId::Coder)
    }

    pub async fn repair_script(&self, script: &str, diagnostics: &str) -> RepairOutcome {
        let stage = RepairerStage::new(self.entry, self.rules);
        let request = RepairRequest::new(script, diagnostics);
        let outcome = self
            .runner()
            .run(&stage, &request, self.policy(StageId::Repairer))
            .await;
        RepairOutcome::from_stage(outcome, &request)
    }

    /// Never fails: exhaustion yields [`NarrationSet::fallback_for`].
    pub async fn narrate(
        &self,
        reasoning: &ReasoningOutput,
        manifest: &SceneManifest,
    ) -> NarrationOutcome {
        let ctx = NarrationContext {
            reasoning: reasoning.clone(),
            manifest: manifest.clone(),
        };
        match self
            .runner()
            .run(&NarratorStage, &ctx, self.policy(StageId::Narrator))
            .await
        {
            StageOutcome::Valid { value, attempts } => {
                let mismatch = narration_coverage(&value, manifest);
                if let Some(note) = &mismatch {
                    warn!(mismatch = %note, "Narration does not match the scene plan");
                }
                NarrationOutcome {
                    narration: value,
                    fallback: false,
                    attempts,
                    mismatch,
                }
            }
            StageOutcome::Exhausted {
                attempts, failure, ..
            } => {
                warn!(error = %failure, "Narration unavailable, using scene titles");
                NarrationOutcome {
                    narration: NarrationSet::fallback_for(manifest),
                    fallback: true,
                    attempts,
                    mismatch: None,
                }
            }
        }
    }
}

#[async_trait]
impl ScriptRepairer for StageSet {
    async fn repair(&self, script: &str, diagnostics: &str) -> RepairOutcome {
        self.repair_script(script, diagnostics).await
    }
}
