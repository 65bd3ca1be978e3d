//! One render attempt, start to finish.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use tracing::{debug, info, warn};

use scenesmith_config::SandboxSettings;
use scenesmith_runner::{CommandSpec, NativeRunner, ProcessRunner, RunnerError};
use scenesmith_utils::atomic_write::{move_file_atomic, write_file_atomic};
use scenesmith_utils::paths::StoragePaths;

use crate::artifact::discover_artifact;
use crate::error::SandboxError;
use crate::result::{
    ARTIFACT_MISSING_DIAGNOSTIC, EXIT_INTERNAL, EXIT_SCRIPT_WRITE_FAILED, EXIT_TIMED_OUT,
    EXIT_TOOL_MISSING, ExecutionOutcome, ExecutionResult,
};

/// Name of the in-flight script inside the working area. The renderer names
/// its media subtree after the stem.
pub const WORKING_SCRIPT: &str = "scene.py";

/// Runs a script and reports a typed result. Implementations never fail;
/// every fault becomes an unsuccessful [`ExecutionResult`].
pub trait ScriptExecutor: Send + Sync {
    fn execute(&self, script: &str, entry_point: &str) -> ExecutionResult;
}

impl<E: ScriptExecutor + ?Sized> ScriptExecutor for Arc<E> {
    fn execute(&self, script: &str, entry_point: &str) -> ExecutionResult {
        (**self).execute(script, entry_point)
    }
}

/// Render sandbox rooted at one storage directory.
///
/// The working script and the renderer's media tree live in `temp/` and are
/// overwritten on every attempt. Only one sandbox may use a storage root at
/// a time.
pub struct ExecutionSandbox {
    runner: Arc<dyn ProcessRunner>,
    paths: StoragePaths,
    settings: SandboxSettings,
}

impl std::fmt::Debug for ExecutionSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionSandbox")
            .field("paths", &self.paths)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ExecutionSandbox {
    /// Sandbox using the native process runner. Creates the storage layout.
    pub fn new(paths: StoragePaths, settings: SandboxSettings) -> Result<Self, SandboxError> {
        Self::with_runner(Arc::new(NativeRunner::new()), paths, settings)
    }

    pub fn with_runner(
        runner: Arc<dyn ProcessRunner>,
        paths: StoragePaths,
        settings: SandboxSettings,
    ) -> Result<Self, SandboxError> {
        paths.ensure().map_err(|source| SandboxError::Storage {
            path: paths.root().to_string(),
            source,
        })?;
        Ok(Self {
            runner,
            paths,
            settings,
        })
    }

    #[must_use]
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    #[must_use]
    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    #[must_use]
    pub fn script_path(&self) -> Utf8PathBuf {
        self.paths.temp().join(WORKING_SCRIPT)
    }

    /// Directory the renderer writes this preset's videos into.
    #[must_use]
    pub fn media_dir(&self) -> Utf8PathBuf {
        let stem = WORKING_SCRIPT.trim_end_matches(".py");
        self.paths
            .temp()
            .join("media")
            .join("videos")
            .join(stem)
            .join(self.settings.quality.tag())
    }

    fn command(&self, entry_point: &str) -> CommandSpec {
        // Unbuffered, uncoloured output keeps tracebacks intact for the Repairer.
        CommandSpec::new(&self.settings.tool)
            .arg(self.settings.quality.flag())
            .arg("-o")
            .arg(&self.settings.output_filename)
            .arg(WORKING_SCRIPT)
            .arg(entry_point)
            .cwd(self.paths.temp().into_std_path_buf())
            .env("PYTHONUNBUFFERED", "1")
            .env("NO_COLOR", "1")
    }

    /// Remove everything inside `temp/`, keeping the directory. Returns the
    /// number of entries removed.
    pub fn cleanup_temp(&self) -> Result<usize, SandboxError> {
        let temp = self.paths.temp();
        let cleanup_err = |source| SandboxError::Cleanup {
            path: temp.to_string(),
            source,
        };

        let entries = match fs::read_dir(&temp) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(cleanup_err(e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(cleanup_err)?;
            let path = entry.path();
            let result = if entry.file_type().map_err(cleanup_err)?.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            result.map_err(cleanup_err)?;
            removed += 1;
        }

        info!(path = %temp, removed = removed, "Cleaned working directory");
        Ok(removed)
    }

    fn clear_stale_media(&self) {
        let media = self.media_dir();
        match fs::remove_dir_all(&media) {
            Ok(()) => debug!(path = %media, "Removed stale media"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %media, error = %e, "Could not remove stale media"),
        }
    }

    fn classify_exit(&self, stdout: String, stderr: String, exit_code: Option<i32>) -> ExecutionResult {
        match exit_code {
            Some(0) => self.collect_artifact(stdout, stderr),
            Some(code) => ExecutionResult::failed(ExecutionOutcome::ToolFailed, code, stdout, stderr),
            None => {
                let stderr = if stderr.trim().is_empty() {
                    "Renderer terminated by signal".to_string()
                } else {
                    stderr
                };
                ExecutionResult::failed(ExecutionOutcome::Internal, EXIT_INTERNAL, stdout, stderr)
            }
        }
    }

    fn collect_artifact(&self, stdout: String, stderr: String) -> ExecutionResult {
        let Some(found) = discover_artifact(&self.media_dir(), &self.settings.output_filename) else {
            warn!(dir = %self.media_dir(), "Renderer exited cleanly without output");
            return ExecutionResult::failed(
                ExecutionOutcome::ArtifactMissing,
                0,
                stdout,
                ARTIFACT_MISSING_DIAGNOSTIC.to_string(),
            );
        };

        let file_name = found.file_name().unwrap_or(self.settings.output_filename.as_str());
        let destination = self.paths.outputs().join(file_name);
        match move_file_atomic(&found, &destination) {
            Ok(_) => {
                info!(artifact = %destination, "Render succeeded");
                ExecutionResult::rendered(destination.as_str(), stdout, stderr)
            }
            Err(e) => ExecutionResult::failed(
                ExecutionOutcome::Internal,
                EXIT_INTERNAL,
                stdout,
                format!("Failed to store artifact {found}: {e:#}"),
            ),
        }
    }
}

impl ScriptExecutor for ExecutionSandbox {
    fn execute(&self, script: &str, entry_point: &str) -> ExecutionResult {
        let started = Instant::now();
        let script_path = self.script_path();

        if let Err(e) = write_file_atomic(&script_path, script) {
            return ExecutionResult::synthetic(
                ExecutionOutcome::ScriptWriteFailed,
                EXIT_SCRIPT_WRITE_FAILED,
                format!("Failed to write script to {script_path}: {e:#}"),
            );
        }
        self.clear_stale_media();

        let cmd = self.command(entry_point);
        let timeout = Duration::from_secs(self.settings.timeout_secs);
        info!(command = %cmd.display(), timeout_secs = timeout.as_secs(), "Rendering");

        let result = match self.runner.run(&cmd, timeout) {
            Ok(output) => {
                let stdout = output.stdout_string();
                let stderr = output.stderr_string();
                self.classify_exit(stdout, stderr, output.exit_code)
            }
            Err(RunnerError::Timeout { timeout_seconds }) => ExecutionResult::synthetic(
                ExecutionOutcome::TimedOut,
                EXIT_TIMED_OUT,
                format!("Execution timed out after {timeout_seconds} seconds"),
            ),
            Err(RunnerError::ProgramNotFound { program }) => ExecutionResult::synthetic(
                ExecutionOutcome::ToolMissing,
                EXIT_TOOL_MISSING,
                format!("Rendering tool not found: {program}. Install it or set [sandbox] tool."),
            ),
            Err(RunnerError::NativeExecutionFailed { reason }) => ExecutionResult::synthetic(
                ExecutionOutcome::Internal,
                EXIT_INTERNAL,
                format!("Execution error: {reason}"),
            ),
        };

        debug!(
            success = result.success,
            exit_code = result.exit_code,
            outcome = ?result.outcome,
            duration_ms = started.elapsed().as_millis(),
            "Render attempt finished"
        );
        result
    }
}

/// Path of `tool` on `PATH`, if any.
#[must_use]
pub fn locate_tool(tool: &str) -> Option<PathBuf> {
    which::which(tool).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use scenesmith_runner::ProcessOutput;
    use scenesmith_utils::test_support::utf8_temp_path;
    use std::ffi::OsString;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes `files` under the command's cwd, then returns `result`.
    struct FakeRenderer {
        files: Vec<&'static str>,
        result: Result<ProcessOutput, RunnerError>,
        seen: Mutex<Vec<CommandSpec>>,
    }

    impl FakeRenderer {
        fn new(files: Vec<&'static str>, result: Result<ProcessOutput, RunnerError>) -> Arc<Self> {
            Arc::new(Self {
                files,
                result,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn exit(code: i32, stderr: &str) -> Result<ProcessOutput, RunnerError> {
            Ok(ProcessOutput::new(
                b"rendering".to_vec(),
                stderr.as_bytes().to_vec(),
                Some(code),
            ))
        }
    }

    impl ProcessRunner for FakeRenderer {
        fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
            self.seen.lock().unwrap().push(cmd.clone());
            let cwd = cmd.cwd.clone().unwrap();
            for file in &self.files {
                let path = cwd.join(file);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, b"video").unwrap();
            }
            self.result.clone()
        }
    }

    fn sandbox(temp: &TempDir, runner: Arc<FakeRenderer>) -> ExecutionSandbox {
        let root = utf8_temp_path(temp).join("storage");
        ExecutionSandbox::with_runner(runner, StoragePaths::new(root), SandboxSettings::default())
            .unwrap()
    }

    const MEDIUM_OUTPUT: &str = "media/videos/scene/720p30/output.mp4";

    #[test]
    fn test_success_moves_artifact_into_outputs() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(vec![MEDIUM_OUTPUT], FakeRenderer::exit(0, ""));
        let sandbox = sandbox(&temp, runner.clone());

        let result = sandbox.execute("print('hi')", "GeneratedScene");
        assert!(result.success);
        assert_eq!(result.outcome, ExecutionOutcome::Rendered);

        let artifact = result.artifact_path.unwrap();
        assert!(artifact.ends_with("outputs/output.mp4"));
        assert!(Utf8Path::new(&artifact).exists());
        assert!(!sandbox.media_dir().join("output.mp4").exists());
        assert_eq!(
            fs::read_to_string(sandbox.script_path()).unwrap(),
            "print('hi')"
        );
    }

    #[test]
    fn test_command_line_shape() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(vec![], FakeRenderer::exit(1, "boom"));
        let sandbox = sandbox(&temp, runner.clone());

        sandbox.execute("x", "GeneratedScene");
        let seen = runner.seen.lock().unwrap();
        let args: Vec<_> = seen[0].args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(seen[0].program, "manim");
        assert_eq!(args, ["-qm", "-o", "output.mp4", "scene.py", "GeneratedScene"]);
        assert_eq!(
            seen[0].cwd.as_deref(),
            Some(sandbox.paths().temp().as_std_path())
        );
        let env = seen[0].env.as_ref().unwrap();
        assert_eq!(env.get(&OsString::from("PYTHONUNBUFFERED")), Some(&OsString::from("1")));
        assert_eq!(env.get(&OsString::from("NO_COLOR")), Some(&OsString::from("1")));
    }

    #[test]
    fn test_zero_exit_without_artifact() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(
            vec!["media/videos/scene/720p30/partial_movie_files/GeneratedScene/0.mp4"],
            FakeRenderer::exit(0, ""),
        );
        let sandbox = sandbox(&temp, runner);

        let result = sandbox.execute("x", "GeneratedScene");
        assert!(!result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.outcome, ExecutionOutcome::ArtifactMissing);
        assert_eq!(result.stderr, ARTIFACT_MISSING_DIAGNOSTIC);
    }

    #[test]
    fn test_stale_artifact_not_reused() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(vec![], FakeRenderer::exit(0, ""));
        let sandbox = sandbox(&temp, runner);
        let stale = sandbox.media_dir().join("output.mp4");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"old").unwrap();

        let result = sandbox.execute("x", "GeneratedScene");
        assert_eq!(result.outcome, ExecutionOutcome::ArtifactMissing);
    }

    #[test]
    fn test_nonzero_exit_keeps_stderr() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(
            vec![],
            FakeRenderer::exit(1, "NameError: name 'ShowCreation' is not defined"),
        );
        let result = sandbox(&temp, runner).execute("x", "GeneratedScene");

        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.outcome, ExecutionOutcome::ToolFailed);
        assert!(result.stderr.contains("ShowCreation"));
        assert_eq!(result.stdout, "rendering");
    }

    #[test]
    fn test_timeout_is_distinguished() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(vec![], Err(RunnerError::Timeout { timeout_seconds: 300 }));
        let result = sandbox(&temp, runner).execute("x", "GeneratedScene");

        assert_eq!(result.exit_code, EXIT_TIMED_OUT);
        assert_eq!(result.outcome, ExecutionOutcome::TimedOut);
        assert!(result.stderr.contains("300 seconds"));
    }

    #[test]
    fn test_missing_tool_is_distinguished() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(
            vec![],
            Err(RunnerError::ProgramNotFound {
                program: "manim".into(),
            }),
        );
        let result = sandbox(&temp, runner).execute("x", "GeneratedScene");

        assert_eq!(result.exit_code, EXIT_TOOL_MISSING);
        assert_eq!(result.outcome, ExecutionOutcome::ToolMissing);
    }

    #[test]
    fn test_signal_termination_is_internal() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(vec![], Ok(ProcessOutput::new(vec![], vec![], None)));
        let result = sandbox(&temp, runner).execute("x", "GeneratedScene");

        assert_eq!(result.exit_code, EXIT_INTERNAL);
        assert_eq!(result.outcome, ExecutionOutcome::Internal);
        assert!(!result.stderr.is_empty());
    }

    #[test]
    fn test_unwritable_script_location() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(vec![], FakeRenderer::exit(0, ""));
        let sandbox = sandbox(&temp, runner.clone());
        // A directory where the script file should go blocks the write.
        fs::create_dir_all(sandbox.script_path().join("blocker")).unwrap();

        let result = sandbox.execute("x", "GeneratedScene");
        assert_eq!(result.exit_code, EXIT_SCRIPT_WRITE_FAILED);
        assert_eq!(result.outcome, ExecutionOutcome::ScriptWriteFailed);
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cleanup_keeps_directory() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRenderer::new(vec![MEDIUM_OUTPUT], FakeRenderer::exit(1, "x"));
        let sandbox = sandbox(&temp, runner);
        sandbox.execute("x", "GeneratedScene");

        let removed = sandbox.cleanup_temp().unwrap();
        assert_eq!(removed, 2);
        assert!(sandbox.paths().temp().is_dir());
        assert_eq!(fs::read_dir(sandbox.paths().temp()).unwrap().count(), 0);
    }

    #[test]
    fn test_locate_missing_tool() {
        assert!(locate_tool("scenesmith-no-such-renderer-xyz").is_none());
    }
}
