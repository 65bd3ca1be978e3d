use camino::Utf8PathBuf;

use scenesmith_utils::error::ConfigError;
use scenesmith_utils::types::StageId;

use super::{Config, ConfigSource, ProviderKind, RenderQuality, StagePolicy};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// ```rust
    /// use scenesmith_config::{Config, ProviderKind};
    ///
    /// let config = Config::builder()
    ///     .provider(ProviderKind::Groq)
    ///     .storage_dir("/tmp/scenesmith")
    ///     .execute(true)
    ///     .max_repair_attempts(3)
    ///     .build()
    ///     .expect("valid config");
    /// assert!(config.pipeline.execute);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for [`Config`] that never reads files or the environment.
///
/// All values set via the builder are attributed to
/// [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    provider: Option<ProviderKind>,
    models: Option<Vec<String>>,
    api_key_env: Option<String>,
    base_url: Option<String>,
    storage_dir: Option<Utf8PathBuf>,
    execute: Option<bool>,
    save_logs: Option<bool>,
    narrate: Option<bool>,
    max_repair_attempts: Option<u32>,
    tool: Option<String>,
    quality: Option<RenderQuality>,
    sandbox_timeout_secs: Option<u64>,
    stage_policies: Vec<(StageId, StagePolicy)>,
    require_scene_members: Option<bool>,
    syntax_check: Option<bool>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Ordered model fallback list.
    #[must_use]
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = Some(name.into());
        self
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn storage_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn execute(mut self, execute: bool) -> Self {
        self.execute = Some(execute);
        self
    }

    #[must_use]
    pub fn save_logs(mut self, save_logs: bool) -> Self {
        self.save_logs = Some(save_logs);
        self
    }

    #[must_use]
    pub fn narrate(mut self, narrate: bool) -> Self {
        self.narrate = Some(narrate);
        self
    }

    #[must_use]
    pub fn max_repair_attempts(mut self, attempts: u32) -> Self {
        self.max_repair_attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    #[must_use]
    pub fn quality(mut self, quality: RenderQuality) -> Self {
        self.quality = Some(quality);
        self
    }

    #[must_use]
    pub fn sandbox_timeout_secs(mut self, secs: u64) -> Self {
        self.sandbox_timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn stage_policy(mut self, stage: StageId, policy: StagePolicy) -> Self {
        self.stage_policies.push((stage, policy));
        self
    }

    #[must_use]
    pub fn require_scene_members(mut self, require: bool) -> Self {
        self.require_scene_members = Some(require);
        self
    }

    #[must_use]
    pub fn syntax_check(mut self, enabled: bool) -> Self {
        self.syntax_check = Some(enabled);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = Config::defaults();
        let src = ConfigSource::Programmatic;
        let mark = |config: &mut Config, key: &str| {
            config.source_attribution.insert(key.to_string(), src);
        };

        if let Some(provider) = self.provider {
            config.llm.provider = provider;
            config.llm.models = provider.default_models();
            config.llm.api_key_env = provider.default_api_key_env().to_string();
            mark(&mut config, "llm.provider");
        }
        if let Some(models) = self.models {
            config.llm.models = models;
            mark(&mut config, "llm.models");
        }
        if let Some(name) = self.api_key_env {
            config.llm.api_key_env = name;
            mark(&mut config, "llm.api_key_env");
        }
        if let Some(url) = self.base_url {
            config.llm.base_url = Some(url);
            mark(&mut config, "llm.base_url");
        }
        if let Some(dir) = self.storage_dir {
            config.pipeline.storage_dir = dir;
            mark(&mut config, "pipeline.storage_dir");
        }
        if let Some(execute) = self.execute {
            config.pipeline.execute = execute;
            mark(&mut config, "pipeline.execute");
        }
        if let Some(save_logs) = self.save_logs {
            config.pipeline.save_logs = save_logs;
            mark(&mut config, "pipeline.save_logs");
        }
        if let Some(narrate) = self.narrate {
            config.pipeline.narrate = narrate;
            mark(&mut config, "pipeline.narrate");
        }
        if let Some(attempts) = self.max_repair_attempts {
            config.pipeline.max_repair_attempts = attempts;
            mark(&mut config, "pipeline.max_repair_attempts");
        }
        if let Some(tool) = self.tool {
            config.sandbox.tool = tool;
            mark(&mut config, "sandbox.tool");
        }
        if let Some(quality) = self.quality {
            config.sandbox.quality = quality;
            mark(&mut config, "sandbox.quality");
        }
        if let Some(secs) = self.sandbox_timeout_secs {
            config.sandbox.timeout_secs = secs;
            mark(&mut config, "sandbox.timeout_secs");
        }
        for (stage, policy) in self.stage_policies {
            config.stages.insert(stage, policy);
            mark(&mut config, &format!("stages.{stage}"));
        }
        if let Some(require) = self.require_scene_members {
            config.validation.require_scene_members = require;
            mark(&mut config, "validation.require_scene_members");
        }
        if let Some(enabled) = self.syntax_check {
            config.validation.syntax_check = enabled;
            mark(&mut config, "validation.syntax_check");
        }

        config.validate()?;
        Ok(config)
    }
}
