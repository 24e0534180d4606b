//! In-process memory store with optional JSON snapshot persistence
//!
//! With an [`EmbeddingProvider`] every note and chunk is embedded on write and
//! searches rank by cosine similarity of the stored vectors. Items without a
//! vector, and every item when no embedder is configured or the query cannot
//! be embedded, are ranked lexically: lower-cased word tokens compared by
//! cosine of their term counts. Items scoring zero never match.
//!
//! Appends bump a generation counter under the data lock. Snapshots are
//! written one at a time through `persisted`, atomically via a temp file in
//! the same directory, and a snapshot older than the last one written is
//! dropped. Searches never wait on file IO.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::embedding::{cosine_similarity, EmbeddingProvider};
use super::{DocumentChunk, LongTermMemory, Note};
use crate::error::TaskRouterError;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default)]
    chunks: Vec<DocumentChunk>,
    /// Keyed by note id or `{doc_id}#{index}`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    vectors: HashMap<String, Vec<f32>>,
    #[serde(skip)]
    generation: u64,
}

fn chunk_key(chunk: &DocumentChunk) -> String {
    format!("{}#{}", chunk.doc_id, chunk.index)
}

pub struct MemoryStore {
    data: RwLock<Snapshot>,
    path: Option<PathBuf>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    /// Generation of the snapshot last written to `path`
    persisted: Mutex<u64>,
}

impl MemoryStore {
    /// Volatile store, nothing is written to disk
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(Snapshot::default()),
            path: None,
            embedder: None,
            persisted: Mutex::new(0),
        }
    }

    /// Load the snapshot at `path` if present; later writes go back to it
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TaskRouterError> {
        let path = path.as_ref().to_path_buf();
        let data: Snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            notes = data.notes.len(),
            chunks = data.chunks.len(),
            vectors = data.vectors.len(),
            "Memory store opened"
        );
        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
            embedder: None,
            persisted: Mutex::new(0),
        })
    }

    /// Rank semantically with `embedder`
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub async fn note_count(&self) -> usize {
        self.data.read().await.notes.len()
    }

    pub async fn chunk_count(&self) -> usize {
        self.data.read().await.chunks.len()
    }

    /// Vectors for `texts`, or `None` without an embedder or on failure
    async fn embed(&self, texts: Vec<String>) -> Option<Vec<Vec<f32>>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(&texts).await {
            Ok(vectors) if vectors.len() == texts.len() => Some(vectors),
            Ok(vectors) => {
                warn!(
                    embedder = embedder.name(),
                    expected = texts.len(),
                    got = vectors.len(),
                    "Embedder returned the wrong number of vectors"
                );
                None
            }
            Err(e) => {
                warn!(embedder = embedder.name(), error = %e, "Embedding failed, using lexical ranking");
                None
            }
        }
    }

    async fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        self.embed(vec![query.to_string()])
            .await
            .and_then(|mut v| v.pop())
    }

    /// Serialize the current data and hand it to the writer
    async fn snapshot_after<F>(&self, append: F) -> Result<(), TaskRouterError>
    where
        F: FnOnce(&mut Snapshot) + Send,
    {
        let pending = {
            let mut data = self.data.write().await;
            append(&mut data);
            data.generation += 1;
            match self.path {
                Some(_) => Some((data.generation, serde_json::to_vec_pretty(&*data)?)),
                None => None,
            }
        };
        if let Some((generation, bytes)) = pending {
            self.persist(generation, bytes).await?;
        }
        Ok(())
    }

    async fn persist(&self, generation: u64, bytes: Vec<u8>) -> Result<(), TaskRouterError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let mut written = self.persisted.lock().await;
        if generation <= *written {
            debug!(generation, latest = *written, "Skipping stale memory snapshot");
            return Ok(());
        }
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| TaskRouterError::Io(std::io::Error::other(e)))??;
        *written = generation;
        debug!(generation, "Memory snapshot written");
        Ok(())
    }
}

/// Replace `path` with `bytes` so readers see the old file or the new one, never a mix
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[async_trait]
impl LongTermMemory for MemoryStore {
    async fn search_notes(&self, query: &str, k: usize) -> Result<Vec<Note>, TaskRouterError> {
        let query_vector = self.embed_query(query).await;
        let data = self.data.read().await;
        Ok(rank(
            query,
            query_vector.as_deref(),
            &data.notes,
            &data.vectors,
            k,
            |n| (n.id.clone(), n.content.as_str()),
        ))
    }

    async fn search_chunks(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<DocumentChunk>, TaskRouterError> {
        let query_vector = self.embed_query(query).await;
        let data = self.data.read().await;
        Ok(rank(
            query,
            query_vector.as_deref(),
            &data.chunks,
            &data.vectors,
            k,
            |c| (chunk_key(c), c.content.as_str()),
        ))
    }

    async fn save_note(
        &self,
        topic: &str,
        content: &str,
        kind: &str,
    ) -> Result<Note, TaskRouterError> {
        let note = Note::new(topic, content, kind);
        let vector = self
            .embed(vec![note.content.clone()])
            .await
            .and_then(|mut v| v.pop());

        let stored = note.clone();
        self.snapshot_after(move |data| {
            if let Some(vector) = vector {
                data.vectors.insert(stored.id.clone(), vector);
            }
            data.notes.push(stored);
        })
        .await?;
        info!(topic, kind, "Note saved");
        Ok(note)
    }

    async fn add_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<usize, TaskRouterError> {
        let added = chunks.len();
        let vectors = self
            .embed(chunks.iter().map(|c| c.content.clone()).collect())
            .await;

        self.snapshot_after(move |data| {
            if let Some(vectors) = vectors {
                for (chunk, vector) in chunks.iter().zip(vectors) {
                    data.vectors.insert(chunk_key(chunk), vector);
                }
            }
            data.chunks.extend(chunks);
        })
        .await?;
        Ok(added)
    }
}

/// Lower-cased alphanumeric word tokens
fn tokenize(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *counts.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    counts
}

fn lexical_cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(t, x)| b.get(t).map(|y| x * y))
        .sum();
    let norm = |v: &HashMap<String, f64>| v.values().map(|x| x * x).sum::<f64>().sqrt();
    dot / (norm(a) * norm(b))
}

/// Top `k` items by similarity; ties keep the most recently added first
fn rank<T, F>(
    query: &str,
    query_vector: Option<&[f32]>,
    items: &[T],
    vectors: &HashMap<String, Vec<f32>>,
    k: usize,
    describe: F,
) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> (String, &str),
{
    let query_terms = tokenize(query);
    let mut scored: Vec<(f64, &T)> = items
        .iter()
        .rev()
        .map(|item| {
            let (key, text) = describe(item);
            let score = match (query_vector, vectors.get(&key)) {
                (Some(q), Some(v)) => f64::from(cosine_similarity(q, v)),
                _ => lexical_cosine(&query_terms, &tokenize(text)),
            };
            (score, item)
        })
        .filter(|(score, _)| *score > 0.0)
        .collect();
    // Stable sort keeps newest-first order among equal scores
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(k)
        .map(|(_, item)| item.clone())
        .collect()
}
