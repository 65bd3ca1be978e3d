use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use scenesmith_utils::error::ConfigError;
use scenesmith_utils::types::StageId;

use super::model::{LlmFile, PipelineFile, SandboxFile, StageOverride, ValidationFile};
use super::{CliArgs, Config, ConfigSource, ENV_PROVIDER, ENV_STORAGE_DIR, ProviderKind, RenderQuality};

/// Directory holding the config file, relative to a project root.
pub const CONFIG_DIR: &str = ".scenesmith";
pub const CONFIG_FILE: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlConfig {
    pub llm: Option<LlmFile>,
    pub pipeline: Option<PipelineFile>,
    pub sandbox: Option<SandboxFile>,
    pub stages: Option<BTreeMap<String, StageOverride>>,
    pub validation: Option<ValidationFile>,
}

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

fn parse_provider(raw: &str) -> Result<ProviderKind, ConfigError> {
    ProviderKind::from_str(raw.trim()).map_err(|_| {
        invalid(
            "llm.provider",
            format!("'{raw}' (expected groq, openrouter or gemini)"),
        )
    })
}

fn parse_quality(raw: &str) -> Result<RenderQuality, ConfigError> {
    RenderQuality::from_str(raw.trim()).map_err(|_| {
        invalid(
            "sandbox.quality",
            format!("'{raw}' (expected low, medium, high, production or fourk)"),
        )
    })
}

fn utf8_path(key: &str, path: PathBuf) -> Result<Utf8PathBuf, ConfigError> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|p| invalid(key, format!("path is not valid UTF-8: {}", p.display())))
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is given.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover starting from `start_dir`, reading overrides from the process
    /// environment.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        Self::discover_with_env(start_dir, cli_args, |key| std::env::var(key).ok())
    }

    /// Path-and-environment-driven variant used by tests to avoid process-global state.
    pub fn discover_with_env<F>(start_dir: &Path, cli_args: &CliArgs, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::defaults();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config)?;
            config.config_path = Some(path.clone());
            debug!(path = %path.display(), "Loaded configuration file");
        }

        config.apply_env(&env)?;
        config.apply_cli(cli_args)?;
        config.validate()?;

        Ok(config)
    }

    /// Walk upward from `start_dir` looking for `.scenesmith/config.toml`.
    ///
    /// The search stops at the first directory that is a repository root
    /// (`.git`, `.hg` or `.svn` present) after checking it.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            let is_repo_root = [".git", ".hg", ".svn"]
                .iter()
                .any(|marker| dir.join(marker).exists());
            if is_repo_root {
                break;
            }

            current = dir.parent();
        }

        None
    }

    /// Parse a config file. A missing file yields an empty configuration.
    pub(crate) fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TomlConfig::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file: {}", path.display()));
            }
        };

        let parsed: TomlConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(e.to_string()))?;
        Ok(parsed)
    }

    fn attribute(&mut self, key: &str, source: ConfigSource) {
        self.source_attribution.insert(key.to_string(), source);
    }

    fn set_provider(&mut self, provider: ProviderKind, source: ConfigSource) {
        let previous = self.llm.provider;
        self.llm.provider = provider;
        self.attribute("llm.provider", source);

        // Provider-specific defaults follow the provider unless explicitly set.
        if previous != provider {
            if self.source_of("llm.models") == ConfigSource::Default {
                self.llm.models = provider.default_models();
            }
            if self.source_of("llm.api_key_env") == ConfigSource::Default {
                self.llm.api_key_env = provider.default_api_key_env().to_string();
            }
        }
    }

    fn apply_file(&mut self, file: TomlConfig) -> Result<(), ConfigError> {
        let src = ConfigSource::Config;

        if let Some(llm) = file.llm {
            if let Some(models) = llm.models {
                self.llm.models = models;
                self.attribute("llm.models", src);
            }
            if let Some(api_key_env) = llm.api_key_env {
                self.llm.api_key_env = api_key_env;
                self.attribute("llm.api_key_env", src);
            }
            if let Some(provider) = llm.provider {
                self.set_provider(parse_provider(&provider)?, src);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
                self.attribute("llm.base_url", src);
            }
            if let Some(timeout) = llm.request_timeout_secs {
                self.llm.request_timeout_secs = timeout;
                self.attribute("llm.request_timeout_secs", src);
            }
        }

        if let Some(pipeline) = file.pipeline {
            if let Some(dir) = pipeline.storage_dir {
                self.pipeline.storage_dir = Utf8PathBuf::from(dir);
                self.attribute("pipeline.storage_dir", src);
            }
            if let Some(execute) = pipeline.execute {
                self.pipeline.execute = execute;
                self.attribute("pipeline.execute", src);
            }
            if let Some(save_logs) = pipeline.save_logs {
                self.pipeline.save_logs = save_logs;
                self.attribute("pipeline.save_logs", src);
            }
            if let Some(narrate) = pipeline.narrate {
                self.pipeline.narrate = narrate;
                self.attribute("pipeline.narrate", src);
            }
            if let Some(max) = pipeline.max_repair_attempts {
                self.pipeline.max_repair_attempts = max;
                self.attribute("pipeline.max_repair_attempts", src);
            }
        }

        if let Some(sandbox) = file.sandbox {
            if let Some(tool) = sandbox.tool {
                self.sandbox.tool = tool;
                self.attribute("sandbox.tool", src);
            }
            if let Some(quality) = sandbox.quality {
                self.sandbox.quality = parse_quality(&quality)?;
                self.attribute("sandbox.quality", src);
            }
            if let Some(timeout) = sandbox.timeout_secs {
                self.sandbox.timeout_secs = timeout;
                self.attribute("sandbox.timeout_secs", src);
            }
            if let Some(name) = sandbox.output_filename {
                self.sandbox.output_filename = name;
                self.attribute("sandbox.output_filename", src);
            }
        }

        if let Some(stages) = file.stages {
            for (name, overrides) in stages {
                let stage = StageId::from_str(&name).map_err(|_| {
                    invalid(&format!("stages.{name}"), "unknown stage name")
                })?;
                let policy = self.stage_policy(stage);
                let updated = super::StagePolicy {
                    temperature: overrides.temperature.unwrap_or(policy.temperature),
                    max_tokens: overrides.max_tokens.unwrap_or(policy.max_tokens),
                    max_attempts: overrides.max_attempts.unwrap_or(policy.max_attempts),
                };
                self.stages.insert(stage, updated);
                self.attribute(&format!("stages.{stage}"), src);
            }
        }

        if let Some(validation) = file.validation {
            if let Some(require) = validation.require_scene_members {
                self.validation.require_scene_members = require;
                self.attribute("validation.require_scene_members", src);
            }
            if let Some(syntax) = validation.syntax_check {
                self.validation.syntax_check = syntax;
                self.attribute("validation.syntax_check", src);
            }
        }

        Ok(())
    }

    fn apply_env<F>(&mut self, env: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = env(ENV_PROVIDER).filter(|v| !v.trim().is_empty()) {
            self.set_provider(parse_provider(&provider)?, ConfigSource::Env);
        }
        if let Some(dir) = env(ENV_STORAGE_DIR).filter(|v| !v.trim().is_empty()) {
            self.pipeline.storage_dir = Utf8PathBuf::from(dir);
            self.attribute("pipeline.storage_dir", ConfigSource::Env);
        }
        Ok(())
    }

    fn apply_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        let src = ConfigSource::Cli;

        if !cli.models.is_empty() {
            self.llm.models = cli.models.clone();
            self.attribute("llm.models", src);
        }
        if let Some(provider) = &cli.provider {
            self.set_provider(parse_provider(provider)?, src);
        }
        if let Some(dir) = &cli.storage_dir {
            self.pipeline.storage_dir = utf8_path("pipeline.storage_dir", dir.clone())?;
            self.attribute("pipeline.storage_dir", src);
        }
        if let Some(execute) = cli.execute {
            self.pipeline.execute = execute;
            self.attribute("pipeline.execute", src);
        }
        if let Some(save_logs) = cli.save_logs {
            self.pipeline.save_logs = save_logs;
            self.attribute("pipeline.save_logs", src);
        }
        if let Some(narrate) = cli.narrate {
            self.pipeline.narrate = narrate;
            self.attribute("pipeline.narrate", src);
        }
        if let Some(quality) = &cli.quality {
            self.sandbox.quality = parse_quality(quality)?;
            self.attribute("sandbox.quality", src);
        }
        if let Some(max) = cli.max_repair_attempts {
            self.pipeline.max_repair_attempts = max;
            self.attribute("pipeline.max_repair_attempts", src);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(root: &Path, content: &str) -> PathBuf {
        let dir = root.join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let config = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap();

        assert!(config.config_path.is_none());
        assert_eq!(config.llm.provider, ProviderKind::Groq);
        assert_eq!(config.pipeline.max_repair_attempts, 3);
        assert_eq!(config.source_of("llm.provider"), ConfigSource::Default);
    }

    #[test]
    fn test_file_values_applied_and_attributed() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            r#"
[llm]
provider = "gemini"

[pipeline]
execute = true
max_repair_attempts = 5

[sandbox]
quality = "high"

[stages.coder]
temperature = 0.1

[validation]
require_scene_members = true
"#,
        );

        let config = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap();

        assert_eq!(config.llm.provider, ProviderKind::Gemini);
        assert_eq!(config.llm.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.llm.models, ProviderKind::Gemini.default_models());
        assert!(config.pipeline.execute);
        assert_eq!(config.pipeline.max_repair_attempts, 5);
        assert_eq!(config.sandbox.quality, RenderQuality::High);
        let coder = config.stage_policy(StageId::Coder);
        assert!((coder.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(coder.max_tokens, 4096);
        assert!(config.validation.require_scene_members);
        assert_eq!(config.source_of("pipeline.execute"), ConfigSource::Config);
        assert_eq!(config.source_of("stages.coder"), ConfigSource::Config);
    }

    #[test]
    fn test_discovery_walks_upward() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let path = write_config(temp.path(), "[pipeline]\nsave_logs = false\n");
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = Config::discover_config_file_from(&nested);

        assert_eq!(found, Some(path));
    }

    #[test]
    fn test_discovery_stops_at_repo_root() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[pipeline]\nsave_logs = false\n");
        let repo = temp.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert_eq!(Config::discover_config_file_from(&repo), None);
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            "[llm]\nprovider = \"gemini\"\n[pipeline]\nstorage_dir = \"from-file\"\n",
        );

        let env = |key: &str| match key {
            ENV_PROVIDER => Some("openrouter".to_string()),
            ENV_STORAGE_DIR => Some("from-env".to_string()),
            _ => None,
        };

        let from_env = Config::discover_with_env(temp.path(), &CliArgs::default(), env).unwrap();
        assert_eq!(from_env.llm.provider, ProviderKind::OpenRouter);
        assert_eq!(from_env.pipeline.storage_dir, Utf8PathBuf::from("from-env"));
        assert_eq!(from_env.source_of("llm.provider"), ConfigSource::Env);

        let cli = CliArgs {
            provider: Some("groq".to_string()),
            storage_dir: Some(PathBuf::from("from-cli")),
            models: vec!["custom-model".to_string()],
            ..CliArgs::default()
        };
        let from_cli = Config::discover_with_env(temp.path(), &cli, env).unwrap();
        assert_eq!(from_cli.llm.provider, ProviderKind::Groq);
        assert_eq!(from_cli.llm.models, vec!["custom-model".to_string()]);
        assert_eq!(from_cli.pipeline.storage_dir, Utf8PathBuf::from("from-cli"));
        assert_eq!(from_cli.source_of("llm.provider"), ConfigSource::Cli);
        assert_eq!(from_cli.source_of("llm.models"), ConfigSource::Cli);
    }

    #[test]
    fn test_invalid_provider_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[llm]\nprovider = \"anthropic\"\n");

        let err = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap_err();

        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "llm.provider"),
            other => panic!("Expected InvalidValue error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_stage_section_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[stages.director]\ntemperature = 0.5\n");

        let err = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap_err();

        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "stages.director"),
            other => panic!("Expected InvalidValue error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_toml_is_invalid_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[pipeline\nexecute = true\n");

        let err = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap_err();

        assert!(
            err.chain()
                .any(|cause| matches!(cause.downcast_ref::<ConfigError>(), Some(ConfigError::InvalidFile(_))))
        );
    }

    #[test]
    fn test_explicit_missing_config_path() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(temp.path().join("nope.toml")),
            ..CliArgs::default()
        };

        let err = Config::discover_with_env(temp.path(), &cli, no_env).unwrap_err();

        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::NotFound { path }) => assert!(path.ends_with("nope.toml")),
            other => panic!("Expected NotFound error, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_runs_after_merge() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let cli = CliArgs {
            max_repair_attempts: Some(0),
            ..CliArgs::default()
        };

        let err = Config::discover_with_env(temp.path(), &cli, no_env).unwrap_err();

        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "pipeline.max_repair_attempts");
            }
            other => panic!("Expected InvalidValue error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let parsed = Config::load_config_file(&temp.path().join("missing.toml")).unwrap();
        assert!(parsed.llm.is_none());
        assert!(parsed.stages.is_none());
    }
}
