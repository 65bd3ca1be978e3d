use scenesmith_utils::error::ConfigError;

use super::Config;

fn invalid(key: impl Into<String>, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.models.is_empty() {
            return Err(invalid("llm.models", "must list at least one model"));
        }
        if self.llm.models.iter().any(|m| m.trim().is_empty()) {
            return Err(invalid("llm.models", "model names cannot be blank"));
        }
        if self.llm.api_key_env.trim().is_empty() {
            return Err(invalid("llm.api_key_env", "cannot be empty"));
        }
        if let Some(base_url) = &self.llm.base_url
            && !(base_url.starts_with("https://") || base_url.starts_with("http://"))
        {
            return Err(invalid("llm.base_url", format!("'{base_url}' is not an http(s) URL")));
        }
        if !(5..=3600).contains(&self.llm.request_timeout_secs) {
            return Err(invalid(
                "llm.request_timeout_secs",
                "must be between 5 and 3600 seconds",
            ));
        }

        if !(1..=10).contains(&self.pipeline.max_repair_attempts) {
            return Err(invalid(
                "pipeline.max_repair_attempts",
                "must be between 1 and 10",
            ));
        }
        if self.pipeline.storage_dir.as_str().trim().is_empty() {
            return Err(invalid("pipeline.storage_dir", "cannot be empty"));
        }

        if self.sandbox.tool.trim().is_empty() {
            return Err(invalid("sandbox.tool", "cannot be empty"));
        }
        if !(5..=3600).contains(&self.sandbox.timeout_secs) {
            return Err(invalid(
                "sandbox.timeout_secs",
                "must be between 5 and 3600 seconds",
            ));
        }
        let name = &self.sandbox.output_filename;
        if name.is_empty() || name.contains(['/', '\\']) || !name.ends_with(".mp4") {
            return Err(invalid(
                "sandbox.output_filename",
                format!("'{name}' must be a bare file name ending in .mp4"),
            ));
        }

        for (stage, policy) in &self.stages {
            if !(0.0..=2.0).contains(&policy.temperature) {
                return Err(invalid(
                    format!("stages.{stage}.temperature"),
                    "must be between 0.0 and 2.0",
                ));
            }
            if !(1..=32768).contains(&policy.max_tokens) {
                return Err(invalid(
                    format!("stages.{stage}.max_tokens"),
                    "must be between 1 and 32768",
                ));
            }
            if !(1..=10).contains(&policy.max_attempts) {
                return Err(invalid(
                    format!("stages.{stage}.max_attempts"),
                    "must be between 1 and 10",
                ));
            }
        }

        Ok(())
    }
}
