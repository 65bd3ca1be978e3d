//! Pipeline orchestration.
//!
//! [`Orchestrator`] runs Reasoner, Planner and Coder in order, persists the
//! script, optionally narrates, and hands the script to [`RetryManager`]
//! when rendering is requested. Every run ends in a [`PipelineResult`].

pub mod pipeline;
pub mod retry;
pub mod session_log;

pub use pipeline::{FailureKind, Orchestrator, PipelineResult, RunOptions};
pub use retry::{DEFAULT_MAX_ATTEMPTS, ExecutionHistoryEntry, RetryManager, RetryOutcome, RetryState};
pub use session_log::{
    ExecutionSummary, LogWriter, NarrationRecord, SessionLog, StageRecords, TimelineEntry,
};
