//! scenesmith - prompt to animation with validated generation stages
//!
//! A natural-language request flows through five stages backed by a
//! generation provider:
//!
//! ```text
//! Reasoner → Planner → Coder → [Narrator] → RetryManager(ExecutionSandbox ⇄ Repairer)
//! ```
//!
//! Each stage validates the model's output against a schema and retries
//! with a corrective instruction. The render loop runs the generated script
//! in a sandbox and asks the Repairer for a patch after every failure.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export GROQ_API_KEY=...
//! scenesmith "explain the derivative of x^2"
//! scenesmith --execute --quality low "visualize the Pythagorean theorem"
//! ```
//!
//! # Quick Start (Library)
//!
//! ```no_run
//! use scenesmith::{Config, Orchestrator, RunOptions};
//!
//! # async fn demo() -> Result<(), scenesmith::ScenesmithError> {
//! let config = Config::builder().execute(false).build()?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//! let result = orchestrator
//!     .run("area of a circle", RunOptions::from(&config.pipeline))
//!     .await;
//! println!("script: {:?}", result.script_path);
//! # Ok(())
//! # }
//! ```
//!
//! # Stable Public API
//!
//! - [`Config`] and [`ConfigBuilder`] - configuration
//! - [`Orchestrator`], [`RunOptions`], [`PipelineResult`] - running the pipeline
//! - [`ScenesmithError`] and [`ExitCode`] - errors and CLI exit codes
//! - [`StageId`] - stage identifiers
//!
//! The member crates are re-exported as modules for lower-level use.

pub mod cli;

pub use scenesmith_config::{CliArgs, Config, ConfigBuilder, ConfigSource, ProviderKind, RenderQuality};
pub use scenesmith_orchestrator::{
    ExecutionHistoryEntry, FailureKind, Orchestrator, PipelineResult, RetryManager, RetryOutcome,
    RunOptions, SessionLog,
};
pub use scenesmith_sandbox::{ExecutionOutcome, ExecutionResult, ExecutionSandbox, ScriptExecutor};
pub use scenesmith_stages::{
    NarrationSet, ReasoningOutput, RepairOutcome, SceneManifest, ScriptRepairer, StageSet,
};
pub use scenesmith_utils::error::{ScenesmithError, StageError, UserFriendlyError};
pub use scenesmith_utils::exit_codes::ExitCode;
pub use scenesmith_utils::types::StageId;

#[doc(hidden)]
pub use scenesmith_config as config;
#[doc(hidden)]
pub use scenesmith_llm as llm;
#[doc(hidden)]
pub use scenesmith_orchestrator as orchestrator;
#[doc(hidden)]
pub use scenesmith_runner as runner;
#[doc(hidden)]
pub use scenesmith_sandbox as sandbox;
#[doc(hidden)]
pub use scenesmith_stages as stages;
#[doc(hidden)]
pub use scenesmith_utils as utils;
