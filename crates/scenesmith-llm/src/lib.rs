//! Generation provider backends for scenesmith
//!
//! Every stage talks to a remote text-generation service through the
//! [`LlmBackend`] trait. Concrete backends:
//!
//! - [`OpenAiCompatBackend`] for Groq and OpenRouter
//! - [`GeminiBackend`] for Google's `generateContent` API
//!
//! [`from_config`] builds the configured backend and wraps it in a
//! [`ModelFallbackBackend`] carrying the ordered model list.

mod gemini_backend;
mod http_client;
mod model_fallback;
mod openai_compat_backend;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use gemini_backend::{GEMINI_BASE_URL, GeminiBackend};
pub use model_fallback::ModelFallbackBackend;
pub use openai_compat_backend::{GROQ_BASE_URL, OPENROUTER_BASE_URL, OpenAiCompatBackend};
pub use scenesmith_utils::error::LlmError;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role, generate};

use scenesmith_config::{Config, ProviderKind};
use tracing::debug;

/// Construct a backend for the configured provider, reading the API key from
/// the process environment.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` if the API key variable is unset or
/// empty, or the HTTP client cannot be built.
pub fn from_config(config: &Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    from_config_with_env(config, |name| std::env::var(name).ok())
}

/// Like [`from_config`] with an injectable environment lookup.
///
/// # Errors
///
/// See [`from_config`].
pub fn from_config_with_env<F>(config: &Config, env: F) -> Result<Box<dyn LlmBackend>, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    let llm = &config.llm;
    let api_key = env(&llm.api_key_env)
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            LlmError::Misconfiguration(format!(
                "{} API key not found in environment variable '{}'. \
                 Set this variable or configure a different api_key_env in [llm].",
                llm.provider, llm.api_key_env
            ))
        })?;

    let default_model = llm.models.first().cloned().unwrap_or_default();
    let base_url = llm.base_url.clone();

    let inner: Box<dyn LlmBackend> = match llm.provider {
        ProviderKind::Groq => Box::new(OpenAiCompatBackend::groq(api_key, base_url, default_model)?),
        ProviderKind::OpenRouter => Box::new(OpenAiCompatBackend::openrouter(
            api_key,
            base_url,
            default_model,
        )?),
        ProviderKind::Gemini => Box::new(GeminiBackend::new(api_key, base_url, default_model)?),
    };

    debug!(
        provider = %llm.provider,
        models = ?llm.models,
        "Constructed generation backend"
    );

    Ok(Box::new(ModelFallbackBackend::new(
        inner,
        llm.models.iter().cloned(),
    )))
}
