//! OpenAI-compatible chat completions backend
//!
//! Groq and OpenRouter both expose the `/chat/completions` wire format, so one
//! backend serves both; only the endpoint, credentials and a couple of
//! attribution headers differ.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use scenesmith_utils::error::LlmError;

use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

/// Default Groq chat completions endpoint
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default OpenRouter chat completions endpoint
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// HTTP-Referer header value sent to OpenRouter
const OPENROUTER_REFERER: &str = "https://github.com/scenesmith/scenesmith";

/// X-Title header value sent to OpenRouter
const OPENROUTER_TITLE: &str = "scenesmith";

/// Sampling parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

/// Resolve sampling parameters for an invocation.
///
/// `inv.metadata["max_tokens"]` and `inv.metadata["temperature"]` win over
/// the backend defaults.
pub(crate) fn resolve_params(inv: &LlmInvocation, defaults: HttpParams) -> HttpParams {
    let max_tokens = inv
        .metadata
        .get("max_tokens")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(defaults.max_tokens);

    let temperature = inv
        .metadata
        .get("temperature")
        .and_then(|v| v.as_f64())
        .map(|v| v as f32)
        .unwrap_or(defaults.temperature);

    HttpParams {
        max_tokens,
        temperature,
    }
}

/// Backend for providers speaking the OpenAI chat completions format
#[derive(Clone)]
pub struct OpenAiCompatBackend {
    client: Arc<HttpClient>,
    provider: &'static str,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl std::fmt::Debug for OpenAiCompatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatBackend")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatBackend {
    pub(crate) fn new(
        provider: &'static str,
        api_key: String,
        base_url: String,
        default_model: String,
        default_params: HttpParams,
        client: Arc<HttpClient>,
    ) -> Self {
        Self {
            client,
            provider,
            base_url,
            api_key,
            default_model,
            default_params,
        }
    }

    /// Groq backend.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn groq(
        api_key: impl Into<String>,
        base_url: Option<String>,
        default_model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self::new(
            "groq",
            api_key.into(),
            base_url.unwrap_or_else(|| GROQ_BASE_URL.to_string()),
            default_model.into(),
            HttpParams::default(),
            Arc::new(HttpClient::new()?),
        ))
    }

    /// OpenRouter backend.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn openrouter(
        api_key: impl Into<String>,
        base_url: Option<String>,
        default_model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self::new(
            "openrouter",
            api_key.into(),
            base_url.unwrap_or_else(|| OPENROUTER_BASE_URL.to_string()),
            default_model.into(),
            HttpParams::default(),
            Arc::new(HttpClient::new()?),
        ))
    }

    #[must_use]
    pub fn provider(&self) -> &'static str {
        self.provider
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve_model(&self, inv: &LlmInvocation) -> String {
        if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        }
    }

    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            })
            .collect()
    }

    fn build_request(&self, model: &str, params: HttpParams, inv: &LlmInvocation) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: Self::convert_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        }
    }

    fn parse_response(&self, body: ChatResponse, model: String) -> Result<LlmResult, LlmError> {
        let choice = body.choices.into_iter().next().ok_or_else(|| {
            LlmError::Transport(format!("{} response missing choices[0]", self.provider))
        })?;

        let content = choice.message.content.ok_or_else(|| {
            LlmError::Transport(format!(
                "{} response missing content in choices[0]",
                self.provider
            ))
        })?;

        let mut result = LlmResult::new(content, self.provider, model);
        if let Some(usage) = body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }
        if let Some(reason) = choice.finish_reason {
            result = result.with_extension("finish_reason", serde_json::json!(reason));
        }
        Ok(result)
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = self.resolve_model(&inv);
        let params = resolve_params(&inv, self.default_params);

        debug!(
            provider = self.provider,
            stage = %inv.stage,
            model = %model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking chat completions backend"
        );

        let request_body = self.build_request(&model, params, &inv);

        let mut request = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body);
        if self.provider == "openrouter" {
            request = request
                .header("HTTP-Referer", OPENROUTER_REFERER)
                .header("X-Title", OPENROUTER_TITLE);
        }

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, self.provider)
            .await?;

        let body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse {} response: {e}", self.provider))
        })?;

        let result = self
            .parse_response(body, model)?
            .with_timeout_seconds(inv.timeout.as_secs());

        debug!(
            provider = self.provider,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Chat completions invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
