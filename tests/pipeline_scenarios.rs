//! End-to-end pipeline scenarios against a scripted provider and a fake
//! renderer. No network, no manim.

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scenesmith::llm::LlmError;
use scenesmith::llm::mock::ScriptedBackend;
use scenesmith::runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use scenesmith::sandbox::ARTIFACT_MISSING_DIAGNOSTIC;
use scenesmith::utils::paths::StoragePaths;
use scenesmith::utils::test_support::{utf8_temp_path, valid_scene_script};
use scenesmith::{
    Config, ExecutionOutcome, ExecutionSandbox, ExitCode, FailureKind, Orchestrator,
    RetryManager, RunOptions, ScriptExecutor, StageError, StageId, StageSet,
};
use tempfile::TempDir;

const REASONING: &str =
    r#"{"concept": "Derivatives", "steps": ["secant lines", "shrinking h", "tangent slope"]}"#;
const MANIFEST: &str = r#"{"scenes": [
    {"title": "Secant", "objects": ["Axes", "Line"], "animations": ["Create"]},
    {"title": "Tangent", "objects": ["Dot", "Line"], "animations": ["Transform"]}
]}"#;

/// Renderer stand-in: one entry per call, `Some(code)` exits with that code,
/// `true` in the pair writes the expected video first.
struct FakeRenderer {
    script: Mutex<Vec<(Option<i32>, bool)>>,
    calls: Mutex<u32>,
}

impl FakeRenderer {
    fn new(script: Vec<(Option<i32>, bool)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().rev().collect()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl ProcessRunner for FakeRenderer {
    fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        *self.calls.lock().unwrap() += 1;
        let (code, write_video) = self.script.lock().unwrap().pop().unwrap_or((Some(1), false));
        if write_video {
            let dir = cmd.cwd.clone().unwrap().join("media/videos/scene/480p15");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("output.mp4"), b"mp4").unwrap();
        }
        let stderr = if code == Some(0) {
            Vec::new()
        } else {
            b"Traceback (most recent call last):\nNameError: name 'ShowCreation' is not defined\n"
                .to_vec()
        };
        Ok(ProcessOutput::new(Vec::new(), stderr, code))
    }
}

fn config(temp: &TempDir) -> Config {
    Config::builder()
        .storage_dir(utf8_temp_path(temp))
        .quality(scenesmith::RenderQuality::Low)
        .save_logs(false)
        .narrate(false)
        .build()
        .unwrap()
}

fn orchestrator(temp: &TempDir, backend: &Arc<ScriptedBackend>, renderer: &Arc<FakeRenderer>) -> Orchestrator {
    let config = config(temp);
    let paths = StoragePaths::new(config.pipeline.storage_dir.clone());
    let sandbox = ExecutionSandbox::with_runner(renderer.clone(), paths.clone(), config.sandbox.clone()).unwrap();
    Orchestrator::new(StageSet::from_config(backend.clone(), &config), paths, 3)
        .with_executor(Arc::new(sandbox))
}

fn code_responses() -> Vec<String> {
    vec![REASONING.into(), MANIFEST.into(), format!("```python\n{}\n```", valid_scene_script())]
}

fn execute() -> RunOptions {
    RunOptions {
        execute: true,
        save_logs: false,
        narrate: false,
    }
}

#[tokio::test]
async fn scenario_a_reasoning_accepted_empty_plan_rejected() {
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::with_responses([
        REASONING,
        r#"{"scenes": []}"#,
        r#"{"scenes": []}"#,
    ]));
    let stages = StageSet::from_config(backend.clone(), &config(&temp));

    let reasoning = stages.reason("explain derivatives").await.unwrap();
    assert_eq!(reasoning.concept, "Derivatives");
    assert_eq!(reasoning.steps.len(), 3);

    match stages.plan(&reasoning).await {
        Err(StageError::Exhausted { stage, reason, .. }) => {
            assert_eq!(stage, StageId::Planner);
            assert!(reason.contains("scenes' cannot be empty"), "{reason}");
        }
        other => panic!("Expected planner exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_b_coder_missing_entry_point_aborts_pipeline() {
    let temp = TempDir::new().unwrap();
    let bad = "from manim import *\n\nclass Demo(Scene):\n    def construct(self):\n        pass\n";
    let backend = Arc::new(ScriptedBackend::with_responses([REASONING, MANIFEST, bad, bad]));
    let renderer = FakeRenderer::new(vec![]);

    let result = orchestrator(&temp, &backend, &renderer).run("x", execute()).await;

    assert!(!result.success);
    assert_eq!(result.failure, Some(FailureKind::Stage));
    assert_eq!(result.exit_code(), ExitCode::PIPELINE_FAILURE);
    assert!(result.error_message.unwrap().contains("Missing GeneratedScene class definition"));
    assert_eq!(backend.call_count(), 4);
    // Second coder attempt carried the correction.
    assert!(backend.prompts()[3].contains("CRITICAL"));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn scenario_c_zero_exit_without_artifact() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let renderer = FakeRenderer::new(vec![(Some(0), false)]);
    let sandbox = ExecutionSandbox::with_runner(
        renderer,
        StoragePaths::new(config.pipeline.storage_dir.clone()),
        config.sandbox.clone(),
    )
    .unwrap();

    let result = sandbox.execute(&valid_scene_script(), "GeneratedScene");
    assert!(!result.success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.outcome, ExecutionOutcome::ArtifactMissing);
    assert_eq!(result.stderr, ARTIFACT_MISSING_DIAGNOSTIC);
}

#[tokio::test]
async fn scenario_d_success_on_third_attempt() {
    let temp = TempDir::new().unwrap();
    let mut responses = code_responses();
    let fixed = format!("```python\n{}\n```", valid_scene_script());
    responses.push(fixed.clone());
    responses.push(fixed);
    let backend = Arc::new(ScriptedBackend::with_responses(responses));
    let renderer = FakeRenderer::new(vec![(Some(1), false), (Some(1), false), (Some(0), true)]);

    let result = orchestrator(&temp, &backend, &renderer).run("x", execute()).await;

    assert!(result.success, "{:?}", result.error_message);
    let execution = result.session_log.stages.execution.clone().unwrap();
    assert_eq!(execution.attempts, 3);
    assert_eq!(execution.history.len(), 3);
    for (i, entry) in execution.history.iter().enumerate() {
        assert_eq!(entry.attempt, i as u32 + 1);
        assert_eq!(entry.success, i == 2);
    }
    let artifact = result.artifact_path.unwrap();
    assert!(artifact.ends_with("outputs/output.mp4"), "{artifact}");
    assert!(fs::metadata(&artifact).is_ok());
    assert_eq!(renderer.calls(), 3);
    // The repairer saw the renderer's traceback.
    assert!(backend.prompts()[3].contains("ShowCreation"));
}

#[tokio::test]
async fn scenario_e_repairer_fault_stops_loop() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp);
    let backend = Arc::new(ScriptedBackend::new([
        Err(LlmError::ProviderOutage("503".into())),
        Err(LlmError::ProviderOutage("503".into())),
    ]));
    let repairer = StageSet::from_config(backend.clone(), &config);
    let renderer = FakeRenderer::new(vec![(Some(1), false), (Some(0), true), (Some(0), true)]);
    let sandbox = ExecutionSandbox::with_runner(
        renderer.clone(),
        StoragePaths::new(config.pipeline.storage_dir.clone()),
        config.sandbox.clone(),
    )
    .unwrap();

    let outcome = RetryManager::new(&sandbox, &repairer, 3)
        .run(&valid_scene_script(), "GeneratedScene")
        .await;

    assert!(!outcome.success());
    assert!(outcome.aborted);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.history.len(), 1);
    assert_eq!(outcome.result.exit_code, 1);
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn execution_failure_still_reports_script_path() {
    let temp = TempDir::new().unwrap();
    let mut responses = code_responses();
    for _ in 0..4 {
        responses.push(format!("```python\n{}\n```", valid_scene_script()));
    }
    let backend = Arc::new(ScriptedBackend::with_responses(responses));
    let renderer = FakeRenderer::new(vec![(Some(1), false), (Some(1), false), (Some(1), false)]);

    let result = orchestrator(&temp, &backend, &renderer).run("x", execute()).await;

    assert!(!result.success);
    assert_eq!(result.failure, Some(FailureKind::Execution));
    let script = result.script_path.unwrap();
    assert_eq!(fs::read_to_string(script).unwrap(), valid_scene_script());
    assert!(result.error_message.unwrap().contains("after 3 attempt(s)"));
    assert_eq!(renderer.calls(), 3);
}

#[tokio::test]
async fn provider_fallback_switches_model_on_rate_limit() {
    use scenesmith::llm::{LlmBackend, ModelFallbackBackend};

    let inner = ScriptedBackend::new([
        Err(LlmError::RateLimited("429".into())),
        Ok(REASONING.to_string()),
    ]);
    let models = vec!["primary".to_string(), "secondary".to_string()];
    let backend: Arc<dyn LlmBackend> = Arc::new(ModelFallbackBackend::new(Box::new(inner), models));
    let temp = TempDir::new().unwrap();
    let stages = StageSet::from_config(backend, &config(&temp));

    let reasoning = stages.reason("x").await.unwrap();
    assert_eq!(reasoning.concept, "Derivatives");
}

#[tokio::test]
async fn session_logs_written_when_enabled() {
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::with_responses(code_responses()));
    let renderer = FakeRenderer::new(vec![]);
    let orch = orchestrator(&temp, &backend, &renderer);

    let options = RunOptions {
        execute: false,
        save_logs: true,
        narrate: false,
    };
    let result = orch.run("x", options).await;
    assert!(result.success);

    let logs: Vec<String> = fs::read_dir(orch.paths().logs())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    let session = logs.iter().find(|n| n.starts_with("session_")).unwrap();
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(orch.paths().logs().join(session)).unwrap()).unwrap();
    assert_eq!(saved["success"], true);
    assert_eq!(saved["request"], "x");
    assert_eq!(saved["stages"]["reasoning"]["concept"], "Derivatives");
}
