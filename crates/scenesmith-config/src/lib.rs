//! Configuration for scenesmith.
//!
//! Values resolve with precedence CLI > environment > `.scenesmith/config.toml`
//! > built-in defaults, and every resolved key remembers where it came from.

pub mod config;

pub use config::{
    CliArgs, Config, ConfigBuilder, ConfigSource, LlmSettings, PipelineSettings, ProviderKind,
    RenderQuality, SandboxSettings, StagePolicy, ValidationSettings,
};
