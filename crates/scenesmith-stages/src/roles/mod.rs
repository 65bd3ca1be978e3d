//! The five stage roles.

mod coder;
mod narrator;
mod planner;
mod reasoner;
mod repairer;

pub use coder::CoderStage;
pub use narrator::{NarrationContext, NarrationOutcome, NarratorStage};
pub use planner::PlannerStage;
pub use reasoner::ReasonerStage;
pub use repairer::{RepairOutcome, RepairRequest, RepairerStage, ScriptRepairer};

/// Pretty JSON for embedding upstream values in an instruction.
fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
