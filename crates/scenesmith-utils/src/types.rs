//! Shared identifiers used across the pipeline crates.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The generation roles that make up one pipeline session.
///
/// The string forms (`reasoner`, `planner`, ...) are stable: they name config
/// sections (`[stages.coder]`), log file prefixes and tracing fields.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StageId {
    Reasoner,
    Planner,
    Coder,
    Repairer,
    Narrator,
}

impl StageId {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoner => "reasoner",
            Self::Planner => "planner",
            Self::Coder => "coder",
            Self::Repairer => "repairer",
            Self::Narrator => "narrator",
        }
    }

    /// Whether exhausting this stage aborts the whole session.
    ///
    /// Repairer and Narrator degrade to a fallback value instead.
    #[must_use]
    pub const fn is_mandatory(&self) -> bool {
        matches!(self, Self::Reasoner | Self::Planner | Self::Coder)
    }

    /// Whether this stage answers with JSON (as opposed to program text).
    #[must_use]
    pub const fn produces_json(&self) -> bool {
        matches!(self, Self::Reasoner | Self::Planner | Self::Narrator)
    }
}
