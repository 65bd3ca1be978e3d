use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use scenesmith_utils::types::StageId;

mod builder;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use model::{
    DEFAULT_GEMINI_MODELS, DEFAULT_GROQ_MODELS, DEFAULT_OPENROUTER_MODELS, LlmSettings,
    PipelineSettings, ProviderKind, RenderQuality, SandboxSettings, StagePolicy,
    ValidationSettings,
};

/// Environment variable overriding `llm.provider`.
pub const ENV_PROVIDER: &str = "SCENESMITH_LLM_PROVIDER";

/// Environment variable overriding `pipeline.storage_dir`.
pub const ENV_STORAGE_DIR: &str = "SCENESMITH_STORAGE_DIR";

/// Where a resolved configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Cli,
    Env,
    Config,
    Programmatic,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        };
        f.write_str(label)
    }
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub provider: Option<String>,
    /// Replaces the model fallback list when non-empty.
    pub models: Vec<String>,
    pub storage_dir: Option<PathBuf>,
    pub execute: Option<bool>,
    pub save_logs: Option<bool>,
    pub narrate: Option<bool>,
    pub quality: Option<String>,
    pub max_repair_attempts: Option<u32>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    pub pipeline: PipelineSettings,
    pub sandbox: SandboxSettings,
    pub stages: BTreeMap<StageId, StagePolicy>,
    pub validation: ValidationSettings,
    /// Config file that was loaded, if any.
    pub config_path: Option<PathBuf>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Config {
    /// Policy for `stage`, falling back to the built-in default.
    #[must_use]
    pub fn stage_policy(&self, stage: StageId) -> StagePolicy {
        self.stages
            .get(&stage)
            .copied()
            .unwrap_or_else(|| StagePolicy::default_for(stage))
    }

    /// Where `key` was resolved from.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .copied()
            .unwrap_or(ConfigSource::Default)
    }

    /// Deterministic configuration for tests: defaults only, logs off.
    #[must_use]
    pub fn minimal_for_testing() -> Self {
        let mut config = Self::defaults();
        config.pipeline.save_logs = false;
        config.pipeline.narrate = false;
        config
    }

    pub(crate) fn defaults() -> Self {
        use strum::IntoEnumIterator;

        let stages = StageId::iter()
            .map(|stage| (stage, StagePolicy::default_for(stage)))
            .collect();

        Self {
            llm: LlmSettings::default(),
            pipeline: PipelineSettings::default(),
            sandbox: SandboxSettings::default(),
            stages,
            validation: ValidationSettings::default(),
            config_path: None,
            source_attribution: HashMap::new(),
        }
    }
}
