//! Execute, diagnose, repair, re-execute.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use scenesmith_sandbox::{EXIT_INTERNAL, ExecutionOutcome, ExecutionResult, ScriptExecutor};
use scenesmith_stages::ScriptRepairer;

/// Default ceiling on render attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to run render attempt `n` (1-based).
    Attempting(u32),
    /// Attempt `n` failed; asking the repairer for a new candidate.
    Repairing(u32),
    Done { success: bool, aborted: bool },
}

/// One render attempt as recorded in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHistoryEntry {
    pub attempt: u32,
    pub exit_code: i32,
    pub success: bool,
}

/// Final result of a repair loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOutcome {
    /// Result of the last render attempt.
    pub result: ExecutionResult,
    /// Render attempts performed; equals `history.len()`.
    pub attempts: u32,
    pub history: Vec<ExecutionHistoryEntry>,
    /// The repairer faulted and the loop stopped early.
    pub aborted: bool,
    /// Script of the last attempt.
    pub final_script: String,
}

impl RetryOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.result.success
    }
}

/// Drives render attempts with repair in between, up to a fixed ceiling.
pub struct RetryManager<'a> {
    executor: &'a dyn ScriptExecutor,
    repairer: &'a dyn ScriptRepairer,
    max_attempts: u32,
}

impl<'a> RetryManager<'a> {
    /// `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(executor: &'a dyn ScriptExecutor, repairer: &'a dyn ScriptRepairer, max_attempts: u32) -> Self {
        Self {
            executor,
            repairer,
            max_attempts: max_attempts.max(1),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Render `script`, repairing after each failure until an attempt
    /// succeeds, the ceiling is reached or the repairer faults.
    ///
    /// A repaired script is always re-executed, even when identical to the
    /// previous one.
    pub async fn run(&self, script: &str, entry_point: &str) -> RetryOutcome {
        let mut state = RetryState::Attempting(1);
        let mut current = script.to_string();
        let mut history: Vec<ExecutionHistoryEntry> = Vec::new();
        let mut last = ExecutionResult::synthetic(
            ExecutionOutcome::Internal,
            EXIT_INTERNAL,
            "no render attempt was made",
        );

        info!(max_attempts = self.max_attempts, "Starting render loop");

        loop {
            debug!(state = ?state, "Render loop state");
            state = match state {
                RetryState::Attempting(n) => {
                    info!(attempt = n, max_attempts = self.max_attempts, "Render attempt");
                    last = self.executor.execute(&current, entry_point);
                    history.push(ExecutionHistoryEntry {
                        attempt: n,
                        exit_code: last.exit_code,
                        success: last.success,
                    });

                    if last.success {
                        RetryState::Done {
                            success: true,
                            aborted: false,
                        }
                    } else if n < self.max_attempts {
                        warn!(attempt = n, exit_code = last.exit_code, outcome = ?last.outcome, "Render attempt failed");
                        RetryState::Repairing(n)
                    } else {
                        warn!(attempts = n, "Render attempts exhausted");
                        RetryState::Done {
                            success: false,
                            aborted: false,
                        }
                    }
                }
                RetryState::Repairing(n) => {
                    let repair = self.repairer.repair(&current, last.diagnostics()).await;
                    if repair.is_fault() {
                        warn!(attempt = n, "Repairer faulted, stopping render loop");
                        RetryState::Done {
                            success: false,
                            aborted: true,
                        }
                    } else {
                        current = repair.script().to_string();
                        RetryState::Attempting(n + 1)
                    }
                }
                RetryState::Done { success, aborted } => {
                    let attempts = u32::try_from(history.len()).unwrap_or(u32::MAX);
                    info!(success = success, attempts = attempts, aborted = aborted, "Render loop finished");
                    return RetryOutcome {
                        result: last,
                        attempts,
                        history,
                        aborted,
                        final_script: current,
                    };
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scenesmith_llm::LlmError;
    use scenesmith_stages::RepairOutcome;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Pops one scripted success flag per call and records the scripts.
    struct ScriptedExecutor {
        outcomes: Mutex<VecDeque<bool>>,
        scripts: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn new(outcomes: &[bool]) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
                scripts: Mutex::new(Vec::new()),
            }
        }

        fn scripts(&self) -> Vec<String> {
            self.scripts.lock().unwrap().clone()
        }
    }

    impl ScriptExecutor for ScriptedExecutor {
        fn execute(&self, script: &str, _entry_point: &str) -> ExecutionResult {
            self.scripts.lock().unwrap().push(script.to_string());
            let ok = self.outcomes.lock().unwrap().pop_front().unwrap_or(false);
            if ok {
                ExecutionResult::rendered("out.mp4", String::new(), String::new())
            } else {
                ExecutionResult::failed(
                    ExecutionOutcome::ToolFailed,
                    1,
                    String::new(),
                    format!("error in {script}"),
                )
            }
        }
    }

    /// Returns `v{n}` for the n-th call, or faults when told to.
    struct CountingRepairer {
        calls: Mutex<Vec<String>>,
        fault: bool,
        echo: bool,
    }

    impl CountingRepairer {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fault: false,
                echo: false,
            }
        }
    }

    #[async_trait]
    impl ScriptRepairer for CountingRepairer {
        async fn repair(&self, script: &str, diagnostics: &str) -> RepairOutcome {
            let mut calls = self.calls.lock().unwrap();
            calls.push(diagnostics.to_string());
            if self.fault {
                RepairOutcome::ProviderFailed {
                    original: script.to_string(),
                    error: LlmError::Transport("connection reset".into()),
                }
            } else if self.echo {
                RepairOutcome::Repaired(script.to_string())
            } else {
                RepairOutcome::Repaired(format!("v{}", calls.len() + 1))
            }
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let executor = ScriptedExecutor::new(&[true]);
        let repairer = CountingRepairer::new();
        let outcome = RetryManager::new(&executor, &repairer, 3).run("v1", "GeneratedScene").await;

        assert!(outcome.success());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.history.len(), 1);
        assert!(repairer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_on_third_attempt() {
        let executor = ScriptedExecutor::new(&[false, false, true]);
        let repairer = CountingRepairer::new();
        let outcome = RetryManager::new(&executor, &repairer, 3).run("v1", "GeneratedScene").await;

        assert!(outcome.success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            outcome.history,
            vec![
                ExecutionHistoryEntry { attempt: 1, exit_code: 1, success: false },
                ExecutionHistoryEntry { attempt: 2, exit_code: 1, success: false },
                ExecutionHistoryEntry { attempt: 3, exit_code: 0, success: true },
            ]
        );
        assert_eq!(executor.scripts(), ["v1", "v2", "v3"]);
        assert_eq!(outcome.final_script, "v3");
    }

    #[tokio::test]
    async fn test_repairer_receives_stderr() {
        let executor = ScriptedExecutor::new(&[false, true]);
        let repairer = CountingRepairer::new();
        RetryManager::new(&executor, &repairer, 3).run("v1", "GeneratedScene").await;

        assert_eq!(*repairer.calls.lock().unwrap(), ["error in v1"]);
    }

    #[tokio::test]
    async fn test_ceiling_reached() {
        let executor = ScriptedExecutor::new(&[false, false, false, true]);
        let repairer = CountingRepairer::new();
        let outcome = RetryManager::new(&executor, &repairer, 3).run("v1", "GeneratedScene").await;

        assert!(!outcome.success());
        assert!(!outcome.aborted);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(executor.scripts().len(), 3);
        // No repair after the final attempt.
        assert_eq!(repairer.calls.lock().unwrap().len(), 2);
        assert_eq!(outcome.result.stderr, "error in v3");
    }

    #[tokio::test]
    async fn test_repairer_fault_aborts() {
        let executor = ScriptedExecutor::new(&[false, true, true]);
        let repairer = CountingRepairer {
            fault: true,
            ..CountingRepairer::new()
        };
        let outcome = RetryManager::new(&executor, &repairer, 3).run("v1", "GeneratedScene").await;

        assert!(!outcome.success());
        assert!(outcome.aborted);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(executor.scripts(), ["v1"]);
        assert_eq!(outcome.result.stderr, "error in v1");
    }

    #[tokio::test]
    async fn test_identical_repair_still_reexecuted() {
        let executor = ScriptedExecutor::new(&[false, false]);
        let repairer = CountingRepairer {
            echo: true,
            ..CountingRepairer::new()
        };
        let outcome = RetryManager::new(&executor, &repairer, 2).run("same", "GeneratedScene").await;

        assert_eq!(outcome.attempts, 2);
        assert_eq!(executor.scripts(), ["same", "same"]);
    }

    #[tokio::test]
    async fn test_zero_ceiling_still_attempts_once() {
        let executor = ScriptedExecutor::new(&[false]);
        let repairer = CountingRepairer::new();
        let manager = RetryManager::new(&executor, &repairer, 0);
        assert_eq!(manager.max_attempts(), 1);

        let outcome = manager.run("v1", "GeneratedScene").await;
        assert_eq!(outcome.attempts, 1);
        assert!(repairer.calls.lock().unwrap().is_empty());
    }
}
