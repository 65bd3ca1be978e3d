use std::collections::BTreeMap;

use super::Config;

impl Config {
    /// Effective configuration as `key -> (value, source)` for `--debug` output.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = self.source_of(key).to_string();
            config.insert(key.to_string(), (value, source));
        };

        add("llm.provider", self.llm.provider.to_string());
        add("llm.models", self.llm.models.join(", "));
        add("llm.api_key_env", self.llm.api_key_env.clone());
        if let Some(base_url) = &self.llm.base_url {
            add("llm.base_url", base_url.clone());
        }
        add(
            "llm.request_timeout_secs",
            self.llm.request_timeout_secs.to_string(),
        );

        add("pipeline.storage_dir", self.pipeline.storage_dir.to_string());
        add("pipeline.execute", self.pipeline.execute.to_string());
        add("pipeline.save_logs", self.pipeline.save_logs.to_string());
        add("pipeline.narrate", self.pipeline.narrate.to_string());
        add(
            "pipeline.max_repair_attempts",
            self.pipeline.max_repair_attempts.to_string(),
        );

        add("sandbox.tool", self.sandbox.tool.clone());
        add("sandbox.quality", self.sandbox.quality.to_string());
        add("sandbox.timeout_secs", self.sandbox.timeout_secs.to_string());
        add("sandbox.output_filename", self.sandbox.output_filename.clone());

        for (stage, policy) in &self.stages {
            add(
                &format!("stages.{stage}"),
                format!(
                    "temperature={} max_tokens={} max_attempts={}",
                    policy.temperature, policy.max_tokens, policy.max_attempts
                ),
            );
        }

        add(
            "validation.require_scene_members",
            self.validation.require_scene_members.to_string(),
        );
        add(
            "validation.syntax_check",
            self.validation.syntax_check.to_string(),
        );

        config
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, ProviderKind};

    #[test]
    fn test_effective_config_reports_sources() {
        let config = Config::builder()
            .provider(ProviderKind::Gemini)
            .build()
            .unwrap();
        let effective = config.effective_config();

        assert_eq!(
            effective.get("llm.provider"),
            Some(&("gemini".to_string(), "programmatic".to_string()))
        );
        assert_eq!(
            effective.get("sandbox.tool"),
            Some(&("manim".to_string(), "default".to_string()))
        );
        assert!(effective.contains_key("stages.coder"));
        assert!(!effective.contains_key("llm.base_url"));
    }
}
