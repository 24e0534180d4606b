//! # Configuration Module
//!
//! Settings come from the environment (optionally a `.env` file). CLI flags
//! override the model and the step budget after loading.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Slack between the summed per-call timeouts and the vertex deadline
const VERTEX_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Runtime configuration for the assistant.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model served by the gateway (e.g. "qwen3-32b")
    pub model: String,

    /// OpenAI-compatible endpoint such as a LiteLLM proxy; when unset the
    /// assistant falls back to a local Ollama server through rig
    pub base_url: Option<String>,

    /// Bearer key for `base_url`
    pub api_key: Option<String>,

    /// Enables Tavily web search; DuckDuckGo is used otherwise
    pub tavily_api_key: Option<String>,

    /// Sampling temperature for every model call
    pub temperature: f64,

    /// Maximum vertex executions per turn
    pub max_steps: usize,

    pub model_timeout_secs: u64,

    pub sandbox_timeout_secs: u64,

    pub search_timeout_secs: u64,

    /// Enables semantic memory ranking; lexical ranking is used otherwise
    pub embedding_model: Option<String>,

    /// Vector width reported for `embedding_model` (Ollama needs it up front)
    pub embedding_dims: usize,

    pub embedding_timeout_secs: u64,

    /// JSON snapshot of long-term memory
    pub memory_path: PathBuf,

    /// Where ingested PDFs are copied
    pub notes_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "qwen3-32b".to_string(),
            base_url: None,
            api_key: None,
            tavily_api_key: None,
            temperature: 0.3,
            max_steps: 15,
            model_timeout_secs: 60,
            sandbox_timeout_secs: 5,
            search_timeout_secs: 30,
            embedding_model: None,
            embedding_dims: 768,
            embedding_timeout_secs: 30,
            memory_path: PathBuf::from("memory/store.json"),
            notes_dir: PathBuf::from("notes"),
        }
    }
}

/// Non-empty value of `key`, if set
fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; values that fail to parse are
    /// reported with the variable name.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Some(val) = var("MODEL_NAME") {
            config.model = val;
        }
        config.base_url = var("LITELLM_BASE_URL");
        config.api_key = var("LITELLM_API_KEY");
        config.tavily_api_key = var("TAVILY_API_KEY");

        if let Some(val) = var("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.3)")?;
        }

        if let Some(val) = var("MAX_STEPS") {
            config.max_steps = val
                .parse()
                .context("MAX_STEPS must be a valid positive integer")?;
        }

        if let Some(val) = var("MODEL_TIMEOUT_SECS") {
            config.model_timeout_secs = val
                .parse()
                .context("MODEL_TIMEOUT_SECS must be a whole number of seconds")?;
        }

        if let Some(val) = var("SANDBOX_TIMEOUT_SECS") {
            config.sandbox_timeout_secs = val
                .parse()
                .context("SANDBOX_TIMEOUT_SECS must be a whole number of seconds")?;
        }

        if let Some(val) = var("SEARCH_TIMEOUT_SECS") {
            config.search_timeout_secs = val
                .parse()
                .context("SEARCH_TIMEOUT_SECS must be a whole number of seconds")?;
        }

        config.embedding_model = var("EMBEDDING_MODEL");

        if let Some(val) = var("EMBEDDING_DIMS") {
            config.embedding_dims = val
                .parse()
                .context("EMBEDDING_DIMS must be a valid positive integer")?;
        }

        if let Some(val) = var("EMBEDDING_TIMEOUT_SECS") {
            config.embedding_timeout_secs = val
                .parse()
                .context("EMBEDDING_TIMEOUT_SECS must be a whole number of seconds")?;
        }

        if let Some(val) = var("MEMORY_PATH") {
            config.memory_path = PathBuf::from(val);
        }

        if let Some(val) = var("NOTES_DIR") {
            config.notes_dir = PathBuf::from(val);
        }

        Ok(config)
    }

    /// Reject out-of-range values before anything is built.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_steps == 0 {
            anyhow::bail!("MAX_STEPS must be at least 1");
        }

        if [
            self.model_timeout_secs,
            self.sandbox_timeout_secs,
            self.search_timeout_secs,
            self.embedding_timeout_secs,
        ]
        .contains(&0)
        {
            anyhow::bail!("Timeouts must be at least one second");
        }

        if self.model.is_empty() {
            anyhow::bail!("MODEL_NAME cannot be empty");
        }

        if self.embedding_model.is_some() && self.embedding_dims == 0 {
            anyhow::bail!("EMBEDDING_DIMS must be at least 1");
        }

        Ok(())
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn sandbox_timeout(&self) -> Duration {
        Duration::from_secs(self.sandbox_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    /// Engine deadline for a single vertex
    ///
    /// Sums every bounded call one vertex can make (two query embeddings, a
    /// web search, a model call and a sandbox run) and adds a margin, so a
    /// slow call always hits its own timeout and falls back inside the worker
    /// before the engine aborts the run.
    pub fn vertex_timeout(&self) -> Duration {
        self.embedding_timeout() * 2
            + self.search_timeout()
            + self.model_timeout()
            + self.sandbox_timeout()
            + VERTEX_TIMEOUT_MARGIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.model, "qwen3-32b");
        assert!((config.temperature - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.max_steps, 15);
        assert_eq!(config.model_timeout_secs, 60);
        assert_eq!(config.sandbox_timeout_secs, 5);
        assert_eq!(config.search_timeout_secs, 30);
        assert!(config.embedding_model.is_none());
        assert_eq!(config.memory_path, PathBuf::from("memory/store.json"));
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_temperature() {
        let config = Config {
            temperature: 3.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_budget() {
        let config = Config {
            max_steps: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MAX_STEPS"));
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let config = Config {
            sandbox_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_search_timeout() {
        let config = Config {
            search_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_vertex_timeout_outlasts_every_call() {
        let config = Config {
            model_timeout_secs: 120,
            search_timeout_secs: 20,
            embedding_timeout_secs: 15,
            sandbox_timeout_secs: 5,
            ..Config::default()
        };

        let per_call = config.model_timeout()
            + config.search_timeout()
            + config.embedding_timeout() * 2
            + config.sandbox_timeout();
        assert!(config.vertex_timeout() > per_call);
        assert!(config.vertex_timeout() > config.model_timeout());
        assert_eq!(config.vertex_timeout(), Duration::from_secs(185));
    }
}
