//! Scripted provider for tests and offline runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::config::LLMConfig;
use super::provider::{LLMProvider, LLMResponse};
use crate::error::TaskRouterError;
use crate::state::Message;

type Script = Arc<dyn Fn(&str) -> Result<String, TaskRouterError> + Send + Sync>;

/// Deterministic provider that answers through a closure
///
/// The closure receives the last message of each request, so tests can
/// branch on prompt content. Every prompt is recorded for later assertions.
///
/// ```rust,ignore
/// let provider = ScriptedProvider::new(|prompt| {
///     if prompt.contains("routing assistant") {
///         Ok(r#"{"intent":"quiz","answer_mode":"short"}"#.into())
///     } else {
///         Ok("ok".into())
///     }
/// });
/// ```
#[derive(Clone)]
pub struct ScriptedProvider {
    script: Script,
    prompts: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str) -> Result<String, TaskRouterError> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            prompts: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always reply with `text`
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fail with `ModelUnavailable`
    pub fn failing(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(move |_| Err(TaskRouterError::model_unavailable(reason.clone())))
    }

    /// Prompts seen so far, oldest first
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, TaskRouterError> {
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(prompt.clone());

        let text = (self.script)(&prompt)?;
        Ok(LLMResponse::new(Message::assistant(text)))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}

impl std::fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("calls", &self.call_count())
            .finish()
    }
}
