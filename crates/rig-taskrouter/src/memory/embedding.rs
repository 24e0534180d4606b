//! Text embeddings for semantic memory search
//!
//! [`MemoryStore`](super::MemoryStore) embeds every note and chunk when it is
//! written and ranks by cosine similarity of the stored vectors. Without an
//! embedder it ranks lexically.

use async_trait::async_trait;
use reqwest::Client;
use rig::embeddings::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::TaskRouterError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns texts into vectors, one per input, in input order
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, TaskRouterError>;

    fn name(&self) -> &str;
}

/// Cosine of two vectors; 0 when either is empty, zero or the lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// `POST {base_url}/embeddings` in the OpenAI wire format (LiteLLM, vLLM, OpenAI)
pub struct OpenAICompatibleEmbedder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl OpenAICompatibleEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAICompatibleEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, TaskRouterError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .timeout(self.timeout)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TaskRouterError::retrieval_failure(format!("embeddings: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TaskRouterError::retrieval_failure(format!(
                "embeddings: HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let mut rows = response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| TaskRouterError::retrieval_failure(format!("embeddings: {}", e)))?
            .data;
        if rows.len() != texts.len() {
            return Err(TaskRouterError::retrieval_failure(format!(
                "embeddings: asked for {} vectors, got {}",
                texts.len(),
                rows.len()
            )));
        }
        rows.sort_by_key(|row| row.index);
        debug!(model = %self.model, count = rows.len(), "Embedded texts");
        Ok(rows.into_iter().map(|row| row.embedding).collect())
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

/// Any rig embedding model, e.g. `ollama::Client::embedding_model`
pub struct RigEmbedder<M: EmbeddingModel> {
    model: M,
    label: String,
    timeout: Duration,
}

impl<M: EmbeddingModel> RigEmbedder<M> {
    pub fn new(model: M, label: impl Into<String>) -> Self {
        Self {
            model,
            label: label.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<M> EmbeddingProvider for RigEmbedder<M>
where
    M: EmbeddingModel + Send + Sync,
{
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, TaskRouterError> {
        let embeddings = tokio::time::timeout(self.timeout, self.model.embed_texts(texts.to_vec()))
            .await
            .map_err(|_| {
                TaskRouterError::retrieval_failure(format!(
                    "{}: timed out after {:?}",
                    self.label, self.timeout
                ))
            })?
            .map_err(|e| TaskRouterError::retrieval_failure(format!("{}: {}", self.label, e)))?;
        Ok(embeddings
            .into_iter()
            .map(|e| e.vec.into_iter().map(|x| x as f32).collect())
            .collect())
    }

    fn name(&self) -> &str {
        &self.label
    }
}
