//! # Assistant Module
//!
//! Turns a [`Config`] into a ready [`StudyWorkflow`]: picks the model
//! provider, the web search backend, the sandbox and the memory store.

use anyhow::{Context, Result};
use rig::client::{CompletionClient, EmbeddingsClient, ProviderClient};
use rig::providers::ollama;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use rig_taskrouter::{
    DocumentIngestor, DuckDuckGoSearch, EmbeddingProvider, EngineConfig, IngestReceipt,
    LLMConfig, LLMProvider, LongTermMemory, MemoryStore, Message, ModelGateway,
    OpenAICompatibleEmbedder, OpenAICompatibleProvider, ProcessSandbox, RigAgentAdapter,
    RigEmbedder, SessionOutcome, StudyWorkflow, TavilySearch, WebSearch,
};

use crate::config::Config;

/// Results requested from the web search backend
const SEARCH_RESULTS: usize = 5;

/// One assistant instance: the workflow plus the memory it shares
pub struct Assistant {
    workflow: StudyWorkflow,
    memory: Arc<MemoryStore>,
    notes_dir: std::path::PathBuf,
    max_steps: usize,
}

impl Assistant {
    pub async fn new(config: &Config) -> Result<Self> {
        let mut store = MemoryStore::open(&config.memory_path)
            .await
            .with_context(|| {
                format!("Failed to open memory store at {}", config.memory_path.display())
            })?;
        let embedder = embedding_provider(config);
        if let Some(embedder) = &embedder {
            store = store.with_embedder(embedder.clone());
        }
        let memory = Arc::new(store);

        let gateway = ModelGateway::new(model_provider(config))
            .with_config(LLMConfig::fixed(&config.model).with_temperature(config.temperature))
            .with_timeout(config.model_timeout());

        let search: Arc<dyn WebSearch> = match &config.tavily_api_key {
            Some(key) => Arc::new(
                TavilySearch::new(key)
                    .with_max_results(SEARCH_RESULTS as u32)
                    .with_timeout(config.search_timeout()),
            ),
            None => Arc::new(
                DuckDuckGoSearch::new(SEARCH_RESULTS).with_timeout(config.search_timeout()),
            ),
        };
        info!(
            provider = gateway.provider_name(),
            search = search.name(),
            embeddings = embedder.as_ref().map(|e| e.name()).unwrap_or("lexical"),
            vertex_timeout = ?config.vertex_timeout(),
            "Assistant configured"
        );

        let sandbox = ProcessSandbox::new().with_timeout(config.sandbox_timeout());

        let engine = EngineConfig::new()
            .with_max_steps(config.max_steps)
            .with_vertex_timeout(config.vertex_timeout());

        let workflow = StudyWorkflow::builder(gateway)
            .memory(memory.clone())
            .web_search(search)
            .sandbox(Arc::new(sandbox))
            .engine_config(engine)
            .build()
            .context("Failed to build the study workflow")?;

        Ok(Self {
            workflow,
            memory,
            notes_dir: config.notes_dir.clone(),
            max_steps: config.max_steps,
        })
    }

    /// Run one turn over the whole conversation
    pub async fn ask(&self, history: Vec<Message>) -> Result<SessionOutcome> {
        let outcome = self.workflow.run(history, self.max_steps).await?;
        debug!(steps = ?outcome.visited(), "Turn finished");
        Ok(outcome)
    }

    /// Copy a PDF into the notes directory and index its text
    pub async fn ingest(&self, path: &Path) -> Result<IngestReceipt> {
        let memory: Arc<dyn LongTermMemory> = self.memory.clone();
        let receipt = DocumentIngestor::new(memory, &self.notes_dir)
            .ingest(path)
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;
        Ok(receipt)
    }
}

/// Embeddings from the same endpoint as the chat model, if a model is named
fn embedding_provider(config: &Config) -> Option<Arc<dyn EmbeddingProvider>> {
    let model = config.embedding_model.as_deref()?;
    let timeout = config.embedding_timeout();
    let embedder: Arc<dyn EmbeddingProvider> = match &config.base_url {
        Some(base_url) => {
            let mut embedder = OpenAICompatibleEmbedder::new(base_url, model).with_timeout(timeout);
            if let Some(key) = &config.api_key {
                embedder = embedder.with_api_key(key);
            }
            Arc::new(embedder)
        }
        None => {
            let client = ollama::Client::from_env();
            let model = client.embedding_model_with_ndims(model, config.embedding_dims);
            Arc::new(RigEmbedder::new(model, "ollama").with_timeout(timeout))
        }
    };
    Some(embedder)
}

/// LiteLLM / OpenAI-compatible endpoint when configured, local Ollama otherwise
fn model_provider(config: &Config) -> Arc<dyn LLMProvider> {
    let timeout = config.model_timeout();
    match &config.base_url {
        Some(base_url) => {
            let mut provider =
                OpenAICompatibleProvider::new(base_url, &config.model).with_timeout(timeout);
            if let Some(key) = &config.api_key {
                provider = provider.with_api_key(key);
            }
            Arc::new(provider)
        }
        None => {
            // Reads OLLAMA_API_BASE_URL, defaulting to http://localhost:11434
            let client = ollama::Client::from_env();
            let agent = client
                .agent(&config.model)
                .temperature(config.temperature)
                .build();
            Arc::new(RigAgentAdapter::with_names(agent, "ollama", &config.model))
        }
    }
}
