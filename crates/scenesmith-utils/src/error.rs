use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::exit_codes::ExitCode;
use crate::redaction::redact_secrets;
use crate::types::StageId;

/// Trait for errors that can be rendered for a person at a terminal.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Provider,
    StageExecution,
    Rendering,
    FileSystem,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Provider => write!(f, "Generation Provider"),
            Self::StageExecution => write!(f, "Stage Execution"),
            Self::Rendering => write!(f, "Rendering"),
            Self::FileSystem => write!(f, "File System"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

// ============================================================================
// Configuration errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => format!("Required configuration '{key}' is missing"),
            Self::InvalidValue { key, value } => {
                format!("Configuration value '{value}' is not valid for '{key}'")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Could not locate configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => {
                Some("The configuration file must be valid TOML.".to_string())
            }
            Self::InvalidValue { .. } => Some(
                "Values are checked after CLI flags, environment and config file are merged."
                    .to_string(),
            ),
            Self::NotFound { .. } => Some(
                "An explicit --config path must point to an existing file.".to_string(),
            ),
            Self::MissingRequired(_) | Self::DiscoveryFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check .scenesmith/config.toml for TOML syntax errors".to_string(),
                "Remove unknown keys or sections".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!("Set '{key}' in .scenesmith/config.toml")],
            Self::InvalidValue { key, .. } => vec![
                format!("Fix the value of '{key}'"),
                "Run with --debug to see where each value came from".to_string(),
            ],
            Self::NotFound { .. } => vec![
                "Check the path passed to --config".to_string(),
                "Omit --config to use automatic discovery".to_string(),
            ],
            Self::DiscoveryFailed { .. } => {
                vec!["Pass --config with an explicit path".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

// ============================================================================
// Generation provider errors
// ============================================================================

/// Errors that can occur during generation provider calls
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Request rate limit hit for the current model
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Usage quota for the current model is used up
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error (missing API key, bad base URL)
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Anything the provider reported that fits no other bucket
    #[error("Unknown provider error: {0}")]
    Unknown(String),
}

impl LlmError {
    /// Whether switching to the next model identifier may help.
    #[must_use]
    pub const fn is_fallback_eligible(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::QuotaExhausted(_))
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("Generation provider transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("Generation provider rejected credentials: {msg}"),
            Self::RateLimited(msg) => format!("Generation provider rate limit hit: {msg}"),
            Self::QuotaExhausted(msg) => format!("Generation provider quota exhausted: {msg}"),
            Self::ProviderOutage(msg) => format!("Generation provider outage: {msg}"),
            Self::Timeout { duration } => {
                format!("Generation request timed out after {duration:?}")
            }
            Self::Misconfiguration(msg) => format!("Generation provider misconfigured: {msg}"),
            Self::Unsupported(msg) => format!("Not supported: {msg}"),
            Self::Unknown(msg) => format!("Generation provider error: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::RateLimited(_) | Self::QuotaExhausted(_) => Some(
                "Every model in the fallback list was tried before giving up.".to_string(),
            ),
            Self::ProviderAuth(_) | Self::Misconfiguration(_) => Some(
                "API keys are read from the environment variable named by llm.api_key_env."
                    .to_string(),
            ),
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) => vec![
                "Export GROQ_API_KEY, OPENROUTER_API_KEY or GEMINI_API_KEY".to_string(),
                "Check [llm] in .scenesmith/config.toml".to_string(),
            ],
            Self::RateLimited(_) | Self::QuotaExhausted(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Add more models to llm.models".to_string(),
            ],
            Self::Timeout { .. } => {
                vec!["Increase llm.request_timeout_secs".to_string()]
            }
            Self::Transport(_) | Self::ProviderOutage(_) | Self::Unknown(_) => vec![
                "Check network connectivity".to_string(),
                "Run with --debug for request details".to_string(),
            ],
            Self::Unsupported(_) => vec!["Choose groq, openrouter or gemini".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Misconfiguration(_) | Self::Unsupported(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Provider,
        }
    }
}

// ============================================================================
// Stage errors
// ============================================================================

/// Failure of a generation stage that escapes to the caller.
///
/// Validation failures and provider errors are retried inside the stage;
/// only exhaustion of the attempt ceiling surfaces here. `Provider` is the
/// exhaustion case where the last attempt failed at the provider rather
/// than in validation.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("{stage} stage exhausted after {attempts} attempt(s): {reason}")]
    Exhausted {
        stage: StageId,
        attempts: u32,
        reason: String,
    },

    #[error("{stage} stage exhausted after {attempts} attempt(s): {source}")]
    Provider {
        stage: StageId,
        attempts: u32,
        #[source]
        source: LlmError,
    },
}

impl StageError {
    #[must_use]
    pub fn stage(&self) -> StageId {
        match self {
            Self::Exhausted { stage, .. } | Self::Provider { stage, .. } => *stage,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Provider { attempts, .. } => *attempts,
        }
    }
}

impl UserFriendlyError for StageError {
    fn user_message(&self) -> String {
        match self {
            Self::Exhausted {
                stage,
                attempts,
                reason,
            } => format!("The {stage} stage gave no usable output after {attempts} attempt(s): {reason}"),
            Self::Provider {
                stage,
                attempts,
                source,
            } => format!(
                "The {stage} stage could not reach the generation provider after {attempts} attempt(s): {}",
                source.user_message()
            ),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Exhausted { .. } => Some(
                "Each attempt after a validation failure resends the request with a corrective instruction."
                    .to_string(),
            ),
            Self::Provider { source, .. } => source.context(),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Exhausted { .. } => vec![
                "Rephrase the request more concretely".to_string(),
                "Raise stages.<role>.max_attempts in .scenesmith/config.toml".to_string(),
                "Try a different model with --model".to_string(),
            ],
            Self::Provider { source, .. } => source.suggestions(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::StageExecution
    }
}

// ============================================================================
// Top-level error
// ============================================================================

#[derive(Error, Debug)]
pub enum ScenesmithError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl UserFriendlyError for ScenesmithError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Llm(e) => e.user_message(),
            Self::Stage(e) => e.user_message(),
            Self::Io(e) => format!("File system error: {e}"),
            Self::Render(msg) => format!("Rendering did not produce a video: {msg}"),
            Self::Other(e) => format!("{e:#}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Llm(e) => e.context(),
            Self::Stage(e) => e.context(),
            Self::Render(_) => Some(
                "The generated script was kept in the outputs directory for inspection."
                    .to_string(),
            ),
            Self::Io(_) | Self::Other(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Llm(e) => e.suggestions(),
            Self::Stage(e) => e.suggestions(),
            Self::Render(_) => vec![
                "Check that manim is installed: pip install manim".to_string(),
                "Raise pipeline.max_repair_attempts".to_string(),
            ],
            Self::Io(_) => vec!["Check permissions on the storage directory".to_string()],
            Self::Other(_) => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::Llm(e) => e.category(),
            Self::Stage(e) => e.category(),
            Self::Render(_) => ErrorCategory::Rendering,
            Self::Io(_) | Self::Other(_) => ErrorCategory::FileSystem,
        }
    }
}

impl ScenesmithError {
    /// Message, context and suggestions formatted for a terminal, with
    /// credentials scrubbed.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error: {}\n", self.user_message()));

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        redact_secrets(&output)
    }

    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Llm(LlmError::Misconfiguration(_) | LlmError::ProviderAuth(_)) => {
                ExitCode::PROVIDER_FAILURE
            }
            Self::Llm(LlmError::Unsupported(_)) => ExitCode::CLI_ARGS,
            Self::Llm(_) => ExitCode::PROVIDER_FAILURE,
            Self::Stage(StageError::Provider {
                source: LlmError::Misconfiguration(_) | LlmError::ProviderAuth(_),
                ..
            }) => ExitCode::PROVIDER_FAILURE,
            Self::Stage(_) | Self::Render(_) | Self::Io(_) | Self::Other(_) => {
                ExitCode::PIPELINE_FAILURE
            }
        }
    }
}
