//! Session record and its best-effort persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use camino::Utf8PathBuf;
use scenesmith_sandbox::ExecutionOutcome;
use scenesmith_stages::{NarrationSet, ReasoningOutput, SceneManifest};
use scenesmith_utils::atomic_write::write_file_atomic;
use scenesmith_utils::paths::StoragePaths;
use scenesmith_utils::types::StageId;

use crate::retry::{ExecutionHistoryEntry, RetryOutcome};

/// Summary of the render loop kept in the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub success: bool,
    pub attempts: u32,
    pub aborted: bool,
    pub exit_code: i32,
    pub outcome: ExecutionOutcome,
    pub history: Vec<ExecutionHistoryEntry>,
}

impl From<&RetryOutcome> for ExecutionSummary {
    fn from(outcome: &RetryOutcome) -> Self {
        Self {
            success: outcome.result.success,
            attempts: outcome.attempts,
            aborted: outcome.aborted,
            exit_code: outcome.result.exit_code,
            outcome: outcome.result.outcome,
            history: outcome.history.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationRecord {
    /// Synthesized from scene titles after the narrator gave up.
    pub fallback: bool,
    /// Count or index mismatch against the scene plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<String>,
    #[serde(flatten)]
    pub set: NarrationSet,
}

/// Outputs collected so far. Fields stay `None` for stages that did not run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageRecords {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_manifest: Option<SceneManifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<NarrationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub stage: String,
    pub finished_at: DateTime<Utc>,
}

/// Everything known about one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub request: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub success: bool,
    pub stages: StageRecords,
    pub timeline: Vec<TimelineEntry>,
    pub script_path: Option<String>,
    pub artifact_path: Option<String>,
    pub error: Option<String>,
}

impl SessionLog {
    #[must_use]
    pub fn start(request: &str) -> Self {
        Self {
            request: request.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            duration_seconds: None,
            success: false,
            stages: StageRecords::default(),
            timeline: Vec::new(),
            script_path: None,
            artifact_path: None,
            error: None,
        }
    }

    /// Append a timeline entry for `stage` finishing now.
    pub fn mark(&mut self, stage: &str) {
        self.timeline.push(TimelineEntry {
            stage: stage.to_string(),
            finished_at: Utc::now(),
        });
    }

    pub fn finish(&mut self, success: bool, error: Option<String>) {
        let now = Utc::now();
        let elapsed = now - self.started_at;
        self.finished_at = Some(now);
        self.duration_seconds = Some(elapsed.num_milliseconds() as f64 / 1000.0);
        self.success = success;
        self.error = error;
    }

    /// Log prefix the session is saved under.
    #[must_use]
    pub fn file_prefix(&self) -> &'static str {
        if self.success { "session" } else { "session_error" }
    }
}

/// Writes JSON logs under `logs/`. Failures are logged, never returned.
#[derive(Debug, Clone)]
pub struct LogWriter {
    paths: StoragePaths,
    enabled: bool,
}

impl LogWriter {
    #[must_use]
    pub fn new(paths: StoragePaths, enabled: bool) -> Self {
        Self { paths, enabled }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Save one stage's output as `<stage>_<ts>.json`.
    pub fn stage<T: Serialize>(&self, stage: StageId, value: &T) -> Option<Utf8PathBuf> {
        self.write(stage.as_str(), value)
    }

    pub fn session(&self, log: &SessionLog) -> Option<Utf8PathBuf> {
        self.write(log.file_prefix(), log)
    }

    fn write<T: Serialize>(&self, prefix: &str, value: &T) -> Option<Utf8PathBuf> {
        if !self.enabled {
            return None;
        }
        let path = self.paths.log_file(prefix, Utc::now());
        let json = match serde_json::to_string_pretty(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(prefix = prefix, error = %e, "Could not serialize log");
                return None;
            }
        };
        match write_file_atomic(&path, &json) {
            Ok(_) => {
                debug!(path = %path, "Saved log");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path, error = %format!("{e:#}"), "Could not save log");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenesmith_utils::test_support::utf8_temp_path;
    use tempfile::TempDir;

    #[test]
    fn test_finish_sets_duration_and_prefix() {
        let mut log = SessionLog::start("explain limits");
        log.mark("reasoner");
        log.finish(false, Some("boom".into()));

        assert!(log.duration_seconds.unwrap() >= 0.0);
        assert!(log.finished_at.unwrap() >= log.started_at);
        assert_eq!(log.file_prefix(), "session_error");
        assert_eq!(log.timeline[0].stage, "reasoner");

        log.finish(true, None);
        assert_eq!(log.file_prefix(), "session");
    }

    #[test]
    fn test_unrun_stages_omitted_from_json() {
        let mut log = SessionLog::start("x");
        log.stages.script_chars = Some(42);
        let json = serde_json::to_value(&log).unwrap();

        assert_eq!(json["stages"]["script_chars"], 42);
        assert!(json["stages"].get("reasoning").is_none());
        assert!(json["stages"].get("execution").is_none());
    }

    #[test]
    fn test_writer_saves_stage_log() {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(utf8_temp_path(&temp));
        let writer = LogWriter::new(paths.clone(), true);

        let reasoning = ReasoningOutput {
            concept: "Limits".into(),
            steps: vec!["approach".into()],
        };
        let path = writer.stage(StageId::Reasoner, &reasoning).unwrap();
        assert!(path.file_name().unwrap().starts_with("reasoner_"));
        assert!(path.starts_with(paths.logs()));

        let saved: ReasoningOutput =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, reasoning);
    }

    #[test]
    fn test_disabled_writer_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(utf8_temp_path(&temp));
        let writer = LogWriter::new(paths.clone(), false);

        assert!(writer.session(&SessionLog::start("x")).is_none());
        assert!(!paths.logs().exists());
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let temp = TempDir::new().unwrap();
        let root = utf8_temp_path(&temp);
        // A file where the logs directory should be.
        std::fs::write(root.join("logs"), b"not a dir").unwrap();
        let writer = LogWriter::new(StoragePaths::new(root), true);

        assert!(writer.session(&SessionLog::start("x")).is_none());
    }
}
