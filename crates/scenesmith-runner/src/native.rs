use crate::error::RunnerError;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CommandSpec, ProcessOutput, ProcessRunner};

/// How long to wait for the waiter thread after a kill. A descendant that
/// escaped the kill can keep the output pipes open; the waiter is then left
/// detached.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// Process runner backed by `std::process::Command`.
///
/// Waiting happens on a helper thread so the timeout can be enforced without
/// exposing async. On Unix the child leads its own process group, and on
/// expiry the whole group gets SIGKILL so helpers it spawned die with it. On
/// Windows the child is ended with `TerminateProcess`. Either way
/// [`RunnerError::Timeout`] is returned within [`KILL_GRACE`] of the deadline.
///
/// ```rust,no_run
/// use scenesmith_runner::{CommandSpec, NativeRunner, ProcessRunner};
/// use std::time::Duration;
///
/// let runner = NativeRunner::new();
/// let cmd = CommandSpec::new("manim").arg("--version");
/// let output = runner.run(&cmd, Duration::from_secs(30)).unwrap();
/// assert!(output.success());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        use std::sync::mpsc;
        use std::thread;

        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(command = %cmd.display(), timeout_secs = timeout.as_secs(), "Spawning process");

        let child = command.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                RunnerError::ProgramNotFound {
                    program: cmd.program.to_string_lossy().into_owned(),
                }
            } else {
                RunnerError::NativeExecutionFailed {
                    reason: format!(
                        "Failed to spawn process '{}': {}",
                        cmd.program.to_string_lossy(),
                        e
                    ),
                }
            }
        })?;

        let (tx, rx) = mpsc::channel();
        let child_id = child.id();

        let handle = thread::spawn(move || {
            let output = child.wait_with_output();
            let _ = tx.send(output);
        });

        match rx.recv_timeout(timeout) {
            Ok(output_result) => {
                let _ = handle.join();

                let output = output_result.map_err(|e| RunnerError::NativeExecutionFailed {
                    reason: format!("Failed to wait for process: {e}"),
                })?;

                Ok(ProcessOutput::new(
                    output.stdout,
                    output.stderr,
                    output.status.code(),
                ))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    pid = child_id,
                    timeout_secs = timeout.as_secs(),
                    "Process exceeded timeout, terminating"
                );
                Self::terminate_process(child_id);

                // Reaps the child if the pipes close in time.
                if rx.recv_timeout(KILL_GRACE).is_ok() {
                    let _ = handle.join();
                } else {
                    warn!(pid = child_id, "Output pipes still open after kill, detaching waiter");
                }

                Err(RunnerError::Timeout {
                    timeout_seconds: timeout.as_secs(),
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(RunnerError::NativeExecutionFailed {
                reason: "Process monitoring thread terminated unexpectedly".to_string(),
            }),
        }
    }
}

impl NativeRunner {
    fn terminate_process(pid: u32) {
        #[cfg(unix)]
        {
            // The child was spawned with process_group(0), so its pgid is
            // its pid. Kill the leader too in case the group call fails.
            // SAFETY: kill(2) with ids we spawned; a stale id only yields ESRCH.
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
                libc::kill(pid as i32, libc::SIGKILL);
            }
        }

        #[cfg(windows)]
        {
            use windows::Win32::Foundation::CloseHandle;
            use windows::Win32::System::Threading::{
                OpenProcess, PROCESS_TERMINATE, TerminateProcess,
            };

            unsafe {
                if let Ok(handle) = OpenProcess(PROCESS_TERMINATE, false, pid) {
                    let _ = TerminateProcess(handle, 1);
                    let _ = CloseHandle(handle);
                }
            }
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = pid;
        }
    }
}
