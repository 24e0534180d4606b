//! Model call settings and usage accounting

use serde::{Deserialize, Serialize};

/// Model used when nothing else is configured
pub const DEFAULT_MODEL: &str = "qwen3-32b";

/// Sampling temperature shared by every worker
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

/// Token counts reported by the endpoint, when it reports them
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Settings sent with every model call
///
/// Built once at startup and pinned inside the
/// [`ModelGateway`](super::ModelGateway); workers cannot change it per call.
///
/// ```
/// use rig_taskrouter::llm::LLMConfig;
///
/// let config = LLMConfig::fixed("qwen3-32b");
/// assert_eq!(config.temperature, Some(0.3));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub temperature: Option<f64>,
    /// Reply length cap; endpoints pick their own when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl LLMConfig {
    /// `model` with no sampling settings
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// `model` at the shared worker temperature
    pub fn fixed(model: impl Into<String>) -> Self {
        Self::new(model).with_temperature(DEFAULT_TEMPERATURE)
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
