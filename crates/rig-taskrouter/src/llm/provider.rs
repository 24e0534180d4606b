//! The seam between the workers and whatever serves the model

use async_trait::async_trait;

use super::config::{LLMConfig, TokenUsage};
use crate::error::TaskRouterError;
use crate::state::Message;

/// One model reply
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub message: Message,
    /// Present only when the backend reports it
    pub usage: Option<TokenUsage>,
}

impl LLMResponse {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// Chat-completion backend
///
/// Implementations must be cheap to share: the gateway holds one behind an
/// `Arc` and every worker calls it.
///
/// ```rust,ignore
/// struct Canned;
///
/// #[async_trait]
/// impl LLMProvider for Canned {
///     async fn complete(
///         &self,
///         _messages: &[Message],
///         _config: Option<&LLMConfig>,
///     ) -> Result<LLMResponse, TaskRouterError> {
///         Ok(LLMResponse::new(Message::assistant(r#"{"intent": "quiz"}"#)))
///     }
///
///     fn name(&self) -> &str { "canned" }
///     fn default_model(&self) -> &str { "canned-1" }
/// }
/// ```
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Reply to `messages`; `config` pins model and sampling when given
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, TaskRouterError>;

    /// Short label for logs
    fn name(&self) -> &str;

    /// Model used when the caller passes no config
    fn default_model(&self) -> &str;
}
