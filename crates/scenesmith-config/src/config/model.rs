use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use scenesmith_utils::paths::DEFAULT_STORAGE_DIR;
use scenesmith_utils::types::StageId;

/// Groq models tried in order when the previous one is rate limited.
pub const DEFAULT_GROQ_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-70b-versatile",
    "mixtral-8x7b-32768",
];

pub const DEFAULT_OPENROUTER_MODELS: &[&str] = &["meta-llama/llama-3.3-70b-instruct"];

pub const DEFAULT_GEMINI_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-flash"];

/// Which remote generation service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    Groq,
    OpenRouter,
    Gemini,
}

impl ProviderKind {
    #[must_use]
    pub fn default_models(&self) -> Vec<String> {
        let models = match self {
            Self::Groq => DEFAULT_GROQ_MODELS,
            Self::OpenRouter => DEFAULT_OPENROUTER_MODELS,
            Self::Gemini => DEFAULT_GEMINI_MODELS,
        };
        models.iter().map(|m| (*m).to_string()).collect()
    }

    /// Environment variable the API key is read from unless overridden.
    #[must_use]
    pub const fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Renderer quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RenderQuality {
    Low,
    Medium,
    High,
    Production,
    #[strum(to_string = "fourk", serialize = "4k")]
    FourK,
}

impl RenderQuality {
    /// Command-line flag selecting this preset.
    #[must_use]
    pub const fn flag(&self) -> &'static str {
        match self {
            Self::Low => "-ql",
            Self::Medium => "-qm",
            Self::High => "-qh",
            Self::Production => "-qp",
            Self::FourK => "-qk",
        }
    }

    /// Directory name the renderer writes this preset's videos under.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Low => "480p15",
            Self::Medium => "720p30",
            Self::High => "1080p60",
            Self::Production => "1440p60",
            Self::FourK => "2160p60",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    /// Ordered fallback list; the first entry is tried first.
    pub models: Vec<String>,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let provider = ProviderKind::Groq;
        Self {
            provider,
            models: provider.default_models(),
            api_key_env: provider.default_api_key_env().to_string(),
            base_url: None,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub storage_dir: Utf8PathBuf,
    pub execute: bool,
    pub save_logs: bool,
    pub narrate: bool,
    /// Ceiling of render attempts in the repair loop.
    pub max_repair_attempts: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            storage_dir: Utf8PathBuf::from(DEFAULT_STORAGE_DIR),
            execute: false,
            save_logs: true,
            narrate: true,
            max_repair_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSettings {
    pub tool: String,
    pub quality: RenderQuality,
    pub timeout_secs: u64,
    pub output_filename: String,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            tool: "manim".to_string(),
            quality: RenderQuality::Medium,
            timeout_secs: 300,
            output_filename: "output.mp4".to_string(),
        }
    }
}

/// Sampling and retry policy of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagePolicy {
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_attempts: u32,
}

impl StagePolicy {
    /// Built-in policy: reasoning and planning favour diversity, code and
    /// repair favour determinism.
    #[must_use]
    pub const fn default_for(stage: StageId) -> Self {
        match stage {
            StageId::Reasoner => Self {
                temperature: 0.7,
                max_tokens: 2048,
                max_attempts: 2,
            },
            StageId::Planner => Self {
                temperature: 0.6,
                max_tokens: 2048,
                max_attempts: 2,
            },
            StageId::Coder => Self {
                temperature: 0.3,
                max_tokens: 4096,
                max_attempts: 2,
            },
            StageId::Repairer => Self {
                temperature: 0.2,
                max_tokens: 4096,
                max_attempts: 2,
            },
            StageId::Narrator => Self {
                temperature: 0.7,
                max_tokens: 2048,
                max_attempts: 2,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSettings {
    /// Reject scenes whose `objects` or `animations` list is empty.
    pub require_scene_members: bool,
    /// Parse generated code and reject syntax errors.
    pub syntax_check: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            require_scene_members: false,
            syntax_check: true,
        }
    }
}

// ============================================================================
// File shapes
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LlmFile {
    pub provider: Option<String>,
    pub models: Option<Vec<String>>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PipelineFile {
    pub storage_dir: Option<String>,
    pub execute: Option<bool>,
    pub save_logs: Option<bool>,
    pub narrate: Option<bool>,
    pub max_repair_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SandboxFile {
    pub tool: Option<String>,
    pub quality: Option<String>,
    pub timeout_secs: Option<u64>,
    pub output_filename: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StageOverride {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ValidationFile {
    pub require_scene_members: Option<bool>,
    pub syntax_check: Option<bool>,
}
