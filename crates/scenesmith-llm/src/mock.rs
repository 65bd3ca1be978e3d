//! Scripted backend for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use scenesmith_utils::error::LlmError;

use crate::types::{LlmBackend, LlmInvocation, LlmResult};

/// Backend that replays a fixed queue of responses and records every call.
///
/// Once the queue is empty every further call fails with
/// `LlmError::Unknown("scripted backend exhausted")`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<LlmInvocation>>,
}

impl ScriptedBackend {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, LlmError>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue of successful responses only.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(responses.into_iter().map(|r| Ok(r.into())))
    }

    pub fn push(&self, response: Result<String, LlmError>) {
        lock(&self.responses).push_back(response);
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn invocations(&self) -> Vec<LlmInvocation> {
        lock(&self.calls).clone()
    }

    /// User prompt text of every call, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.calls).iter().map(LlmInvocation::prompt_text).collect()
    }

    /// Model requested by every call, in order.
    pub fn models(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|c| c.model.clone()).collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = inv.model.clone();
        lock(&self.calls).push(inv);
        let next = lock(&self.responses).pop_front();
        match next {
            Some(Ok(text)) => Ok(LlmResult::new(text, "scripted", model)),
            Some(Err(err)) => Err(err),
            None => Err(LlmError::Unknown("scripted backend exhausted".to_string())),
        }
    }
}
