//! Render sandbox.
//!
//! [`ExecutionSandbox`] writes a script into the working area, runs the
//! renderer against it with a hard timeout and classifies the outcome.
//! Every path returns an [`ExecutionResult`]; nothing here panics or
//! propagates an error out of [`ScriptExecutor::execute`].

pub mod artifact;
pub mod error;
pub mod result;
pub mod sandbox;

pub use artifact::discover_artifact;
pub use error::SandboxError;
pub use result::{
    ARTIFACT_MISSING_DIAGNOSTIC, EXIT_INTERNAL, EXIT_SCRIPT_WRITE_FAILED, EXIT_TIMED_OUT,
    EXIT_TOOL_MISSING, ExecutionOutcome, ExecutionResult,
};
pub use sandbox::{ExecutionSandbox, ScriptExecutor, WORKING_SCRIPT, locate_tool};
