use crate::error::RunnerError;
use std::time::Duration;

use super::CommandSpec;

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Get stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Synchronous process execution.
///
/// Implementations MUST use argv-style APIs only (no `sh -c`, no `cmd /C`).
/// The sandbox depends on this trait rather than on [`NativeRunner`]
/// directly so renders can be scripted in tests.
///
/// [`NativeRunner`]: crate::NativeRunner
pub trait ProcessRunner: Send + Sync {
    /// Execute `cmd`, killing it once `timeout` elapses.
    ///
    /// * `Ok(ProcessOutput)` - the process exited (possibly non-zero)
    /// * `Err(RunnerError::Timeout)` - the process was killed at the deadline
    /// * `Err(RunnerError::ProgramNotFound)` - the program does not exist
    /// * `Err(RunnerError::NativeExecutionFailed)` - anything else
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for std::sync::Arc<R> {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        (**self).run(cmd, timeout)
    }
}
