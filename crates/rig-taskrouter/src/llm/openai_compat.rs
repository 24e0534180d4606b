//! OpenAI-compatible chat completions provider
//!
//! Talks to any endpoint that speaks the `/chat/completions` wire format,
//! such as a LiteLLM proxy in front of a self-hosted model.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::config::{LLMConfig, TokenUsage};
use super::provider::{LLMProvider, LLMResponse};
use crate::error::TaskRouterError;
use crate::state::Message;

/// Default timeout for a single HTTP request
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Provider for OpenAI-compatible HTTP endpoints
///
/// # Example
///
/// ```rust,ignore
/// let provider = OpenAICompatibleProvider::new("http://localhost:4000", "qwen3-32b")
///     .with_api_key("sk-local");
/// ```
pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    default_config: LLMConfig,
    timeout: Duration,
}

impl OpenAICompatibleProvider {
    /// Create a provider for `base_url` serving `model`
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            default_config: LLMConfig::fixed(model),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the bearer key sent with each request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Set custom HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Request body for `/chat/completions`
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, TaskRouterError> {
        let config = config.unwrap_or(&self.default_config);
        let body = ChatRequest {
            model: &config.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        debug!(model = %config.model, messages = messages.len(), "Sending chat completion");

        let mut request = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TaskRouterError::model_unavailable("request timed out")
            } else {
                TaskRouterError::model_unavailable(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TaskRouterError::model_unavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TaskRouterError::model_unavailable(format!("bad response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TaskRouterError::model_unavailable("response has no choices"))?
            .message
            .content
            .unwrap_or_default();

        let mut llm_response = LLMResponse::new(Message::assistant(content));
        if let Some(usage) = parsed.usage {
            llm_response =
                llm_response.with_usage(TokenUsage::new(usage.prompt_tokens, usage.completion_tokens));
        }
        Ok(llm_response)
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn default_model(&self) -> &str {
        &self.default_config.model
    }
}

impl std::fmt::Debug for OpenAICompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAICompatibleProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.default_config.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        })
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let provider = OpenAICompatibleProvider::new("http://localhost:4000/", "m");
        assert_eq!(provider.endpoint(), "http://localhost:4000/chat/completions");
    }

    #[test]
    fn test_empty_api_key_ignored() {
        let provider = OpenAICompatibleProvider::new("http://x", "m").with_api_key("");
        assert!(provider.api_key.is_none());
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen3-32b",
                "temperature": 0.3,
                "messages": [{"role": "user", "content": "Hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hello!")))
            .mount(&mock_server)
            .await;

        let provider =
            OpenAICompatibleProvider::new(mock_server.uri(), "qwen3-32b").with_api_key("sk-test");
        let response = provider.complete(&[Message::user("Hi")], None).await.unwrap();

        assert_eq!(response.text(), "Hello!");
        assert_eq!(response.usage, Some(TokenUsage::new(12, 5)));
    }

    #[tokio::test]
    async fn test_null_content_becomes_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&mock_server)
            .await;

        let provider = OpenAICompatibleProvider::new(mock_server.uri(), "m");
        let response = provider.complete(&[Message::user("x")], None).await.unwrap();
        assert_eq!(response.text(), "");
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_model_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&mock_server)
            .await;

        let provider = OpenAICompatibleProvider::new(mock_server.uri(), "m");
        let err = provider
            .complete(&[Message::user("x")], None)
            .await
            .unwrap_err();

        assert!(matches!(err, TaskRouterError::ModelUnavailable(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_model_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let provider = OpenAICompatibleProvider::new(mock_server.uri(), "m");
        let err = provider
            .complete(&[Message::user("x")], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
