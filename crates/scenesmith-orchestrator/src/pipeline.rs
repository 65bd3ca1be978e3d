//! Request → script → (optional) video.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span, warn};

use scenesmith_config::{Config, PipelineSettings};
use scenesmith_sandbox::{ExecutionSandbox, ScriptExecutor};
use scenesmith_stages::{ScriptRepairer, StageSet};
use scenesmith_utils::atomic_write::write_file_atomic;
use scenesmith_utils::error::{ScenesmithError, UserFriendlyError};
use scenesmith_utils::exit_codes::ExitCode;
use scenesmith_utils::paths::StoragePaths;
use scenesmith_utils::redaction::redact_secrets;
use scenesmith_utils::types::StageId;

use crate::retry::RetryManager;
use crate::session_log::{ExecutionSummary, LogWriter, NarrationRecord, SessionLog};

/// Switches for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub execute: bool,
    pub save_logs: bool,
    pub narrate: bool,
}

impl From<&PipelineSettings> for RunOptions {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            execute: settings.execute,
            save_logs: settings.save_logs,
            narrate: settings.narrate,
        }
    }
}

/// Broad reason a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A mandatory stage ran out of attempts.
    Stage,
    /// The provider cannot be used at all (credentials, configuration).
    Provider,
    /// Rendering did not produce a video.
    Execution,
    /// Storage could not be written.
    Storage,
}

impl FailureKind {
    fn of(err: &ScenesmithError) -> Self {
        match err {
            ScenesmithError::Render(_) => Self::Execution,
            ScenesmithError::Io(_) | ScenesmithError::Other(_) => Self::Storage,
            other if other.to_exit_code() == ExitCode::PROVIDER_FAILURE => Self::Provider,
            _ => Self::Stage,
        }
    }
}

/// Well-formed report of one run, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub script_path: Option<String>,
    pub artifact_path: Option<String>,
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    pub duration_seconds: f64,
    pub session_log: SessionLog,
}

impl PipelineResult {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match (self.success, self.failure) {
            (true, _) => ExitCode::SUCCESS,
            (false, Some(FailureKind::Provider)) => ExitCode::PROVIDER_FAILURE,
            (false, _) => ExitCode::PIPELINE_FAILURE,
        }
    }
}

/// Runs the stages in order and, when asked, the render loop.
pub struct Orchestrator {
    stages: StageSet,
    repairer: Arc<dyn ScriptRepairer>,
    executor: Option<Arc<dyn ScriptExecutor>>,
    paths: StoragePaths,
    max_repair_attempts: u32,
}

impl Orchestrator {
    /// Orchestrator without a renderer; the stages also act as repairer.
    #[must_use]
    pub fn new(stages: StageSet, paths: StoragePaths, max_repair_attempts: u32) -> Self {
        Self {
            repairer: Arc::new(stages.clone()),
            stages,
            executor: None,
            paths,
            max_repair_attempts,
        }
    }

    /// Backend, sandbox and stages built from `config`.
    ///
    /// # Errors
    ///
    /// Fails when the provider cannot be configured or the storage layout
    /// cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, ScenesmithError> {
        let backend = scenesmith_llm::from_config(config)?;
        let stages = StageSet::from_config(Arc::from(backend), config);
        let paths = StoragePaths::new(config.pipeline.storage_dir.clone());
        let sandbox = ExecutionSandbox::new(paths.clone(), config.sandbox.clone())
            .map_err(|e| ScenesmithError::Other(anyhow::Error::new(e)))?;

        Ok(Self::new(stages, paths, config.pipeline.max_repair_attempts)
            .with_executor(Arc::new(sandbox)))
    }

    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn ScriptExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    #[must_use]
    pub fn with_repairer(mut self, repairer: Arc<dyn ScriptRepairer>) -> Self {
        self.repairer = repairer;
        self
    }

    #[must_use]
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Run the whole pipeline for `request`. Never returns an error: every
    /// failure is reported inside the [`PipelineResult`].
    pub async fn run(&self, request: &str, options: RunOptions) -> PipelineResult {
        let span = info_span!("pipeline", execute = options.execute);
        async {
            let mut log = SessionLog::start(request);
            let writer = LogWriter::new(self.paths.clone(), options.save_logs);
            info!(request = %request, "Starting pipeline");

            let outcome = self.run_stages(request, options, &mut log, &writer).await;
            let result = match outcome {
                Ok(()) => {
                    log.finish(true, None);
                    info!(duration_seconds = ?log.duration_seconds, "Pipeline completed");
                    self.result(log, None)
                }
                Err(err) => {
                    let message = redact_secrets(&err.to_string());
                    error!(error = %message, "Pipeline failed");
                    log.finish(false, Some(message));
                    self.result(log, Some(&err))
                }
            };
            writer.session(&result.session_log);
            result
        }
        .instrument(span)
        .await
    }

    fn result(&self, log: SessionLog, err: Option<&ScenesmithError>) -> PipelineResult {
        PipelineResult {
            success: log.success,
            script_path: log.script_path.clone(),
            artifact_path: log.artifact_path.clone(),
            error_message: log.error.clone(),
            failure: err.map(FailureKind::of),
            suggestions: err.map(UserFriendlyError::suggestions).unwrap_or_default(),
            duration_seconds: log.duration_seconds.unwrap_or_default(),
            session_log: log,
        }
    }

    async fn run_stages(
        &self,
        request: &str,
        options: RunOptions,
        log: &mut SessionLog,
        writer: &LogWriter,
    ) -> Result<(), ScenesmithError> {
        let reasoning = self.stages.reason(request).await?;
        writer.stage(StageId::Reasoner, &reasoning);
        log.stages.reasoning = Some(reasoning.clone());
        log.mark(StageId::Reasoner.as_str());

        let manifest = self.stages.plan(&reasoning).await?;
        writer.stage(StageId::Planner, &manifest);
        log.stages.scene_manifest = Some(manifest.clone());
        log.mark(StageId::Planner.as_str());

        let script = self.stages.code(&manifest).await?;
        log.stages.script_chars = Some(script.chars().count());
        log.mark(StageId::Coder.as_str());

        let script_path = self.paths.script_output();
        write_file_atomic(&script_path, &script)?;
        info!(path = %script_path, "Saved generated script");
        log.script_path = Some(script_path.to_string());

        if options.narrate {
            let narration = self.stages.narrate(&reasoning, &manifest).await;
            writer.stage(StageId::Narrator, &narration.narration);
            log.stages.narration = Some(NarrationRecord {
                fallback: narration.fallback,
                mismatch: narration.mismatch,
                set: narration.narration,
            });
            log.mark(StageId::Narrator.as_str());
        }

        if !options.execute {
            return Ok(());
        }

        let Some(executor) = self.executor.as_deref() else {
            return Err(ScenesmithError::Render(
                "execution requested but no renderer is configured".to_string(),
            ));
        };

        let manager = RetryManager::new(executor, self.repairer.as_ref(), self.max_repair_attempts);
        let retry = manager.run(&script, self.stages.entry().class_name).await;
        log.stages.execution = Some(ExecutionSummary::from(&retry));
        log.mark("execution");

        if retry.final_script != script {
            match write_file_atomic(&script_path, &retry.final_script) {
                Ok(_) => info!(path = %script_path, "Saved repaired script"),
                Err(e) => warn!(path = %script_path, error = %format!("{e:#}"), "Could not save repaired script"),
            }
        }

        if retry.success() {
            log.artifact_path = retry.result.artifact_path.clone();
            return Ok(());
        }

        let diagnostic = exception_line(retry.result.diagnostics());
        let reason = if retry.aborted {
            format!(
                "rendering failed after {} attempt(s); repair stopped early: {diagnostic}",
                retry.attempts
            )
        } else {
            format!("rendering failed after {} attempt(s): {diagnostic}", retry.attempts)
        };
        Err(ScenesmithError::Render(reason))
    }
}

/// Last non-empty line, which for a traceback is the exception itself.
fn exception_line(diagnostics: &str) -> String {
    let line = diagnostics
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no diagnostic output");
    line.chars().take(200).collect()
}
