//! PDF ingestion into long-term memory
//!
//! Flow: validate → copy into the notes directory → extract text → chunk →
//! index with `doc_id` and the original file name.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use super::chunker::TextChunker;
use super::{DocumentChunk, LongTermMemory};
use crate::error::TaskRouterError;

const PDF_MAGIC: &[u8] = b"%PDF";
const NOT_A_PDF: &str = "Only PDF files are supported.";
const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Turns a document on disk into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, TaskRouterError>;
}

/// Extracts text with the poppler `pdftotext` binary
///
/// The child is killed when the timeout elapses.
#[derive(Debug, Clone)]
pub struct PdfToText {
    program: String,
    timeout: Duration,
}

impl Default for PdfToText {
    fn default() -> Self {
        Self::with_program("pdftotext")
    }
}

impl PdfToText {
    /// Use a different executable with the same CLI
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_EXTRACT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TextExtractor for PdfToText {
    async fn extract(&self, path: &Path) -> Result<String, TaskRouterError> {
        let child = Command::new(&self.program)
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                TaskRouterError::ExecutionFailed(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                ))
            })?
            .map_err(|e| {
                TaskRouterError::ExecutionFailed(format!("could not run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            return Err(TaskRouterError::ExecutionFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Result of a successful ingestion
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub doc_id: String,
    pub filename: String,
    /// Number of chunks indexed
    pub chunks: usize,
    /// Where the copy was stored
    pub stored_at: PathBuf,
}

pub struct DocumentIngestor {
    memory: Arc<dyn LongTermMemory>,
    extractor: Arc<dyn TextExtractor>,
    chunker: TextChunker,
    notes_dir: PathBuf,
}

impl DocumentIngestor {
    pub fn new(memory: Arc<dyn LongTermMemory>, notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            memory,
            extractor: Arc::new(PdfToText::default()),
            chunker: TextChunker::default(),
            notes_dir: notes_dir.into(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Ingest one PDF file
    pub async fn ingest(&self, path: &Path) -> Result<IngestReceipt, TaskRouterError> {
        let is_pdf_name = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf_name {
            return Err(TaskRouterError::invalid_input(NOT_A_PDF));
        }

        let bytes = tokio::fs::read(path).await?;
        if !bytes.starts_with(PDF_MAGIC) {
            warn!(path = %path.display(), "File has a .pdf name but no PDF header");
            return Err(TaskRouterError::invalid_input(NOT_A_PDF));
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown.pdf".to_string());
        let doc_id = uuid::Uuid::new_v4().to_string();

        tokio::fs::create_dir_all(&self.notes_dir).await?;
        let stored_at = self.notes_dir.join(format!("{}.pdf", doc_id));
        tokio::fs::write(&stored_at, &bytes).await?;

        match self.index(&stored_at, &doc_id, &filename).await {
            Ok(indexed) => {
                info!(%doc_id, %filename, chunks = indexed, "Document ingested");
                Ok(IngestReceipt {
                    doc_id,
                    filename,
                    chunks: indexed,
                    stored_at,
                })
            }
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&stored_at).await {
                    warn!(path = %stored_at.display(), error = %remove, "Could not remove copy");
                }
                Err(e)
            }
        }
    }

    /// Extract, chunk and store; returns the number of chunks indexed
    async fn index(
        &self,
        stored_at: &Path,
        doc_id: &str,
        filename: &str,
    ) -> Result<usize, TaskRouterError> {
        let text = self.extractor.extract(stored_at).await?;
        let chunks: Vec<DocumentChunk> = self
            .chunker
            .split(&text)
            .into_iter()
            .enumerate()
            .map(|(index, content)| DocumentChunk {
                doc_id: doc_id.to_string(),
                source: filename.to_string(),
                index,
                content,
            })
            .collect();

        self.memory.add_chunks(chunks).await
    }
}
