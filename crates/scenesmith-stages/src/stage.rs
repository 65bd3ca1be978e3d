//! The generate, validate, retry contract shared by every stage.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, warn};

use scenesmith_config::StagePolicy;
use scenesmith_llm::{LlmBackend, LlmError, generate};
use scenesmith_utils::logging::{log_stage_complete, log_stage_error, log_stage_start, stage_span};
use scenesmith_utils::types::StageId;

use crate::validation::Validation;

/// One role in the pipeline.
///
/// A stage renders an instruction from its typed input, pulls a payload out
/// of the raw model text and validates it. It holds no state between runs.
pub trait Stage: Send + Sync {
    type Input: ?Sized + Sync;
    type Output: Send;

    fn id(&self) -> StageId;

    /// Instruction for the first attempt.
    fn prompt(&self, input: &Self::Input) -> String;

    /// Appended to the instruction after a validation failure.
    fn correction(&self) -> &'static str;

    /// Payload text out of the raw response (fence stripping for code).
    fn extract(&self, raw: &str) -> String;

    /// Schema check of an extracted payload.
    fn validate(&self, payload: &str) -> Validation<Self::Output>;
}

/// Why a single attempt did not produce a valid value.
#[derive(Debug, Clone)]
pub enum AttemptFailure {
    Invalid(String),
    Provider(LlmError),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(reason) => write!(f, "{reason}"),
            Self::Provider(err) => write!(f, "{err}"),
        }
    }
}

/// Result of running a stage to completion.
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// First schema-valid value; no further attempts were made.
    Valid { value: T, attempts: u32 },
    /// Ceiling reached. `last_payload` is the most recent extracted payload,
    /// if any attempt got far enough to produce one.
    Exhausted {
        attempts: u32,
        failure: AttemptFailure,
        last_payload: Option<String>,
    },
}

impl<T> StageOutcome<T> {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Valid { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Convert exhaustion into the error that aborts a mandatory stage.
    pub fn into_result(self, stage: StageId) -> Result<T, scenesmith_utils::error::StageError> {
        use scenesmith_utils::error::StageError;

        match self {
            Self::Valid { value, .. } => Ok(value),
            Self::Exhausted {
                attempts,
                failure: AttemptFailure::Provider(source),
                ..
            } => Err(StageError::Provider {
                stage,
                attempts,
                source,
            }),
            Self::Exhausted {
                attempts,
                failure: AttemptFailure::Invalid(reason),
                ..
            } => Err(StageError::Exhausted {
                stage,
                attempts,
                reason,
            }),
        }
    }
}

/// Drives a [`Stage`] against a backend.
#[derive(Clone, Copy)]
pub struct StageRunner<'a> {
    backend: &'a dyn LlmBackend,
    timeout: Duration,
    model_label: &'a str,
}

impl<'a> StageRunner<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn LlmBackend, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            model_label: "",
        }
    }

    /// Model name shown in the stage span.
    #[must_use]
    pub fn with_model_label(mut self, label: &'a str) -> Self {
        self.model_label = label;
        self
    }

    /// Run `stage` until the first valid payload or until
    /// `policy.max_attempts` provider calls have been made.
    ///
    /// A validation failure resends the base instruction with the stage's
    /// correction appended. A provider failure resends the previous
    /// instruction unchanged. Either way the attempt counts.
    pub async fn run<S>(&self, stage: &S, input: &S::Input, policy: StagePolicy) -> StageOutcome<S::Output>
    where
        S: Stage + ?Sized,
    {
        let id = stage.id();
        let span = stage_span(id, self.model_label);
        self.run_inner(stage, input, policy).instrument(span).await
    }

    async fn run_inner<S>(&self, stage: &S, input: &S::Input, policy: StagePolicy) -> StageOutcome<S::Output>
    where
        S: Stage + ?Sized,
    {
        let id = stage.id();
        let started = Instant::now();
        let max_attempts = policy.max_attempts.max(1);
        let base_prompt = stage.prompt(input);
        let mut prompt = base_prompt.clone();
        let mut last_payload = None;
        let mut failure = AttemptFailure::Invalid("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            log_stage_start(id, attempt, max_attempts);

            let raw = match generate(
                self.backend,
                id.as_str(),
                &prompt,
                policy.max_tokens,
                policy.temperature,
                self.timeout,
            )
            .await
            {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(stage = %id, attempt = attempt, error = %err, "Provider call failed");
                    failure = AttemptFailure::Provider(err);
                    continue;
                }
            };

            let payload = stage.extract(&raw);
            debug!(stage = %id, attempt = attempt, chars = payload.len(), "Received candidate");

            match stage.validate(&payload) {
                Validation::Valid(value) => {
                    log_stage_complete(id, attempt, started.elapsed().as_millis());
                    return StageOutcome::Valid {
                        value,
                        attempts: attempt,
                    };
                }
                Validation::Invalid(reason) => {
                    warn!(stage = %id, attempt = attempt, reason = %reason, "Validation failed");
                    prompt = format!("{base_prompt}\n\n{}", stage.correction());
                    failure = AttemptFailure::Invalid(reason);
                    last_payload = Some(payload);
                }
            }
        }

        log_stage_error(id, &failure.to_string(), started.elapsed().as_millis());
        StageOutcome::Exhausted {
            attempts: max_attempts,
            failure,
            last_payload,
        }
    }
}
