//! Long-term memory shared across runs
//!
//! Two collections live behind one interface:
//!
//! - **notes**: short summaries saved by the supervisor after an approved report
//! - **document chunks**: text extracted from uploaded PDFs
//!
//! Ranking is semantic when an [`EmbeddingProvider`] is configured.
//!
//! Workers receive an `Arc<dyn LongTermMemory>` at construction time.

pub mod chunker;
pub mod embedding;
pub mod ingest;
pub mod store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskRouterError;

pub use chunker::TextChunker;
pub use embedding::{EmbeddingProvider, OpenAICompatibleEmbedder, RigEmbedder};
pub use ingest::{DocumentIngestor, IngestReceipt, PdfToText, TextExtractor};
pub use store::MemoryStore;

/// Number of items pulled into each half of [`RetrievedContext`]
pub const CONTEXT_TOP_K: usize = 5;

/// A saved note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub topic: String,
    pub content: String,
    /// Free-form category, e.g. `report`
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(
        topic: impl Into<String>,
        content: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.into(),
            content: content.into(),
            kind: kind.into(),
            created_at: Utc::now(),
        }
    }

    /// `- [{kind}] {content}`
    pub fn as_bullet(&self) -> String {
        format!("- [{}] {}", self.kind, self.content)
    }
}

/// A chunk of an ingested document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub doc_id: String,
    /// Original file name
    pub source: String,
    pub index: usize,
    pub content: String,
}

impl DocumentChunk {
    /// `[{source}] {content}`
    pub fn as_citation(&self) -> String {
        format!("[{}] {}", self.source, self.content.trim())
    }
}

/// Context pulled from memory for a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievedContext {
    /// Formatted document chunks, empty when nothing matched
    pub document_context: String,
    /// Formatted notes, empty when nothing matched
    pub memory_context: String,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.document_context.is_empty() && self.memory_context.is_empty()
    }
}

/// Interface to the long-term store
#[async_trait]
pub trait LongTermMemory: Send + Sync {
    /// Top document chunks and notes for `query`, already formatted
    async fn retrieve(&self, query: &str) -> Result<RetrievedContext, TaskRouterError> {
        let chunks = self.search_chunks(query, CONTEXT_TOP_K).await?;
        let notes = self.search_notes(query, CONTEXT_TOP_K).await?;

        Ok(RetrievedContext {
            document_context: chunks
                .iter()
                .map(DocumentChunk::as_citation)
                .collect::<Vec<_>>()
                .join("\n\n"),
            memory_context: notes
                .iter()
                .map(Note::as_bullet)
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }

    /// Up to `k` notes most similar to `query`
    async fn search_notes(&self, query: &str, k: usize) -> Result<Vec<Note>, TaskRouterError>;

    /// Up to `k` document chunks most similar to `query`
    async fn search_chunks(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<DocumentChunk>, TaskRouterError>;

    /// Append a note
    async fn save_note(&self, topic: &str, content: &str, kind: &str)
        -> Result<Note, TaskRouterError>;

    /// Append document chunks, returning how many were stored
    async fn add_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<usize, TaskRouterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_bullet() {
        let note = Note::new("TCP", "three-way handshake", "report");
        assert_eq!(note.as_bullet(), "- [report] three-way handshake");
        assert_eq!(note.id.len(), 36);
    }

    #[test]
    fn test_chunk_citation_trims() {
        let chunk = DocumentChunk {
            doc_id: "d1".into(),
            source: "lecture.pdf".into(),
            index: 0,
            content: "  SYN, SYN-ACK, ACK \n".into(),
        };
        assert_eq!(chunk.as_citation(), "[lecture.pdf] SYN, SYN-ACK, ACK");
    }
}
