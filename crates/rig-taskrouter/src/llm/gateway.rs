//! Model gateway used by every worker
//!
//! Wraps an [`LLMProvider`] with the fixed call configuration and a timeout.
//! Whatever goes wrong underneath comes out as `ModelUnavailable`.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::LLMConfig;
use super::provider::LLMProvider;
use crate::error::TaskRouterError;
use crate::state::Message;

/// Default per-call timeout
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ModelGateway {
    provider: Arc<dyn LLMProvider>,
    config: LLMConfig,
    timeout: Duration,
}

impl ModelGateway {
    /// Gateway using the provider's default model at the fixed temperature
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        let config = LLMConfig::fixed(provider.default_model());
        Self {
            provider,
            config,
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_config(mut self, config: LLMConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send a single user prompt and return the reply text
    pub async fn complete(&self, prompt: &str) -> Result<String, TaskRouterError> {
        let messages = [Message::user(prompt)];
        debug!(
            provider = self.provider.name(),
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Model call"
        );

        let call = self.provider.complete(&messages, Some(&self.config));
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => {
                if let Some(usage) = response.usage {
                    debug!(
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "Model usage"
                    );
                }
                Ok(response.message.content)
            }
            Ok(Err(TaskRouterError::ModelUnavailable(reason))) => {
                warn!(%reason, "Model call failed");
                Err(TaskRouterError::ModelUnavailable(reason))
            }
            Ok(Err(other)) => {
                warn!(error = %other, "Model call failed");
                Err(TaskRouterError::model_unavailable(other.to_string()))
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Model call timed out");
                Err(TaskRouterError::model_unavailable(format!(
                    "no reply within {:?}",
                    self.timeout
                )))
            }
        }
    }
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish()
    }
}
