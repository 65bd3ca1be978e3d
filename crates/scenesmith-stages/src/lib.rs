//! Validated generation stages.
//!
//! Every stage follows the same contract: render an instruction, call the
//! backend, extract and validate the payload, and retry with a corrective
//! instruction until the first valid value or the attempt ceiling.
//! [`StageRunner`] implements that loop once; the roles in [`roles`] supply
//! the prompts and validators, and [`StageSet`] binds them to a backend and a
//! [`scenesmith_config::Config`].

pub mod extraction;
pub mod model;
pub mod prompts;
pub mod roles;
mod set;
pub mod stage;
pub mod syntax;
pub mod validation;

pub use model::{
    EntryPoint, FALLBACK_NARRATION_SECONDS, Narration, NarrationSet, ReasoningOutput, Scene,
    SceneManifest,
};
pub use roles::{
    CoderStage, NarrationContext, NarrationOutcome, NarratorStage, PlannerStage, ReasonerStage,
    RepairOutcome, RepairRequest, RepairerStage, ScriptRepairer,
};
pub use set::StageSet;
pub use stage::{AttemptFailure, Stage, StageOutcome, StageRunner};
pub use validation::{Validation, ValidationRules};
