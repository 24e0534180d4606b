//! Adapter for using Rig Agents as an [`LLMProvider`]
//!
//! Rig agents take a single prompt string, so the message list is flattened:
//! system messages become a leading block and the last user message is the
//! prompt body. Every worker sends one user message, so nothing is lost on
//! the main path.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rig::client::{CompletionClient, ProviderClient};
//! use rig::providers::ollama;
//! use rig_taskrouter::compat::RigAgentAdapter;
//!
//! let agent = ollama::Client::from_env().agent("qwen3:32b").temperature(0.3).build();
//! let provider = RigAgentAdapter::with_names(agent, "ollama", "qwen3:32b");
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use rig::agent::Agent;
use rig::completion::{CompletionModel, Prompt};

use crate::error::TaskRouterError;
use crate::llm::{LLMConfig, LLMProvider, LLMResponse};
use crate::state::{Message, Role};

/// [`LLMProvider`] backed by a prebuilt `rig::agent::Agent<M>`
///
/// Model and temperature are fixed when the agent is built, so the
/// gateway's [`LLMConfig`] is ignored here.
pub struct RigAgentAdapter<M: CompletionModel> {
    agent: Arc<Agent<M>>,
    label: String,
    model: String,
}

impl<M: CompletionModel> RigAgentAdapter<M> {
    pub fn new(agent: Agent<M>) -> Self {
        Self::with_names(agent, "rig", "rig-agent")
    }

    /// `label` and `model` only show up in logs
    pub fn with_names(agent: Agent<M>, label: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            agent: Arc::new(agent),
            label: label.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl<M> LLMProvider for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn complete(
        &self,
        messages: &[Message],
        _config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, TaskRouterError> {
        let prompt = flatten_prompt(messages);
        let reply = self
            .agent
            .prompt(prompt.as_str())
            .await
            .map_err(|e| TaskRouterError::model_unavailable(format!("{} agent: {}", self.label, e)))?;

        Ok(LLMResponse::new(Message::assistant(reply)))
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

/// Collapse a message list into one prompt string.
fn flatten_prompt(messages: &[Message]) -> String {
    let mut parts: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    if let Some(user) = messages.iter().rfind(|m| m.role == Role::User) {
        parts.push(&user.content);
    }

    parts.join("\n\n")
}

impl<M: CompletionModel> std::fmt::Debug for RigAgentAdapter<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigAgentAdapter")
            .field("label", &self.label)
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_single_user_message() {
        let prompt = flatten_prompt(&[Message::user("Hello!")]);
        assert_eq!(prompt, "Hello!");
    }

    #[test]
    fn test_flatten_keeps_system_and_last_user() {
        let messages = vec![
            Message::system("Be brief."),
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
        ];
        assert_eq!(flatten_prompt(&messages), "Be brief.\n\nsecond");
    }

    #[test]
    fn test_flatten_empty() {
        assert_eq!(flatten_prompt(&[]), "");
    }
}
