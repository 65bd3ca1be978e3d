//! Model fallback wrapper
//!
//! Wraps any `LlmBackend` with an ordered list of model identifiers. When the
//! current model is rate limited or out of quota the next one is tried. The
//! position in the list lives in a local variable of a single `invoke` call,
//! so fallback never leaks from one call into the next.

use async_trait::async_trait;
use tracing::{debug, warn};

use scenesmith_utils::error::LlmError;

use crate::types::{LlmBackend, LlmInvocation, LlmResult};

pub struct ModelFallbackBackend {
    inner: Box<dyn LlmBackend>,
    models: Vec<String>,
}

impl ModelFallbackBackend {
    /// Wrap `inner`. An empty `models` list passes invocations through untouched.
    pub fn new<I, S>(inner: Box<dyn LlmBackend>, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let models: Vec<String> = models.into_iter().map(Into::into).collect();
        debug!(models = ?models, "Creating ModelFallbackBackend");
        Self { inner, models }
    }

    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Candidate order for one call. An explicitly requested model goes
    /// first, followed by the configured list without duplicates.
    fn candidates(&self, requested: &str) -> Vec<String> {
        let mut candidates = Vec::with_capacity(self.models.len() + 1);
        if !requested.is_empty() {
            candidates.push(requested.to_string());
        }
        for model in &self.models {
            if !candidates.contains(model) {
                candidates.push(model.clone());
            }
        }
        candidates
    }
}

#[async_trait]
impl LlmBackend for ModelFallbackBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let candidates = self.candidates(&inv.model);
        if candidates.is_empty() {
            return self.inner.invoke(inv).await;
        }

        let mut index = 0;
        loop {
            let model = &candidates[index];
            let mut attempt = inv.clone();
            attempt.model = model.clone();

            match self.inner.invoke(attempt).await {
                Ok(result) => {
                    if index > 0 {
                        debug!(model = %model, position = index, "Fallback model succeeded");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_fallback_eligible() && index + 1 < candidates.len() => {
                    warn!(
                        stage = %inv.stage,
                        model = %model,
                        next_model = %candidates[index + 1],
                        error = %err,
                        "Model unavailable, falling back"
                    );
                    index += 1;
                }
                Err(err) => {
                    if err.is_fallback_eligible() {
                        warn!(
                            stage = %inv.stage,
                            tried = candidates.len(),
                            "All fallback models exhausted"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedBackend;
    use crate::types::Message;
    use std::sync::Arc;
    use std::time::Duration;

    /// Shares one scripted backend between the wrapper and the test.
    struct Shared(Arc<ScriptedBackend>);

    #[async_trait]
    impl LlmBackend for Shared {
        async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            self.0.invoke(inv).await
        }
    }

    fn wrap(script: Vec<Result<String, LlmError>>, models: &[&str]) -> (ModelFallbackBackend, Arc<ScriptedBackend>) {
        let scripted = Arc::new(ScriptedBackend::new(script));
        let backend = ModelFallbackBackend::new(
            Box::new(Shared(Arc::clone(&scripted))),
            models.iter().copied(),
        );
        (backend, scripted)
    }

    fn invocation(model: &str) -> LlmInvocation {
        LlmInvocation::new(
            "reasoner",
            model,
            Duration::from_secs(5),
            vec![Message::user("explain derivatives")],
        )
    }

    #[tokio::test]
    async fn test_first_model_success_makes_one_call() {
        let (backend, scripted) = wrap(vec![Ok("ok".into())], &["a", "b", "c"]);

        let result = backend.invoke(invocation("")).await.unwrap();
        assert_eq!(result.raw_response, "ok");
        assert_eq!(scripted.models(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_rate_limit_advances_to_next_model() {
        let (backend, scripted) = wrap(
            vec![
                Err(LlmError::RateLimited("a busy".into())),
                Err(LlmError::QuotaExhausted("b spent".into())),
                Ok("from c".into()),
            ],
            &["a", "b", "c"],
        );

        let result = backend.invoke(invocation("")).await.unwrap();
        assert_eq!(result.raw_response, "from c");
        assert_eq!(result.model_used, "c");
        assert_eq!(scripted.models(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_non_eligible_error_returns_immediately() {
        let (backend, scripted) = wrap(
            vec![Err(LlmError::ProviderAuth("bad key".into())), Ok("never".into())],
            &["a", "b"],
        );

        match backend.invoke(invocation("")).await {
            Err(LlmError::ProviderAuth(_)) => {}
            other => panic!("Expected ProviderAuth, got {other:?}"),
        }
        assert_eq!(scripted.call_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_list_returns_last_error() {
        let (backend, scripted) = wrap(
            vec![
                Err(LlmError::RateLimited("a".into())),
                Err(LlmError::QuotaExhausted("b".into())),
            ],
            &["a", "b"],
        );

        match backend.invoke(invocation("")).await {
            Err(LlmError::QuotaExhausted(msg)) => assert_eq!(msg, "b"),
            other => panic!("Expected QuotaExhausted, got {other:?}"),
        }
        assert_eq!(scripted.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fallback_state_does_not_leak_between_calls() {
        let (backend, scripted) = wrap(
            vec![
                Err(LlmError::RateLimited("a".into())),
                Ok("first call from b".into()),
                Ok("second call from a".into()),
            ],
            &["a", "b"],
        );

        backend.invoke(invocation("")).await.unwrap();
        let second = backend.invoke(invocation("")).await.unwrap();

        assert_eq!(second.raw_response, "second call from a");
        assert_eq!(scripted.models(), vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_requested_model_tried_first_without_duplicates() {
        let (backend, scripted) = wrap(
            vec![
                Err(LlmError::RateLimited("b".into())),
                Ok("from a".into()),
            ],
            &["a", "b"],
        );

        backend.invoke(invocation("b")).await.unwrap();
        assert_eq!(scripted.models(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_empty_model_list_passes_through() {
        let (backend, scripted) = wrap(vec![Ok("raw".into())], &[]);

        backend.invoke(invocation("")).await.unwrap();
        assert_eq!(scripted.models(), vec![""]);
        assert!(backend.models().is_empty());
    }
}
