//! rig-taskrouter: supervisor-driven task routing for Rig
//!
//! One user turn is classified by a router and handed to a specialist:
//! - **research**: a supervisor loops researcher → writer → critiquer until the
//!   draft is approved, three revisions have been written, or the step budget
//!   runs out
//! - **code**: a code helper answers and, on explicit request, runs the code
//! - **quiz**: a quiz helper writes practice questions or a checklist
//!
//! Every worker degrades to fallback text on failure, so a run always ends
//! with an answer.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rig_taskrouter::{Message, ModelGateway, OpenAICompatibleProvider, StudyWorkflow};
//!
//! let provider = OpenAICompatibleProvider::new("http://localhost:4000/v1", "qwen3-32b");
//! let workflow = StudyWorkflow::builder(ModelGateway::new(Arc::new(provider))).build()?;
//!
//! let outcome = workflow
//!     .run(vec![Message::user("Give me a quick answer about TCP handshakes")], 15)
//!     .await?;
//! println!("{}", outcome.answer);
//! ```

pub mod agents;
pub mod compat;
pub mod engine;
pub mod error;
pub mod llm;
pub mod memory;
pub mod session;
pub mod state;
pub mod tools;

// Re-exports for convenience
pub use error::TaskRouterError;
pub use state::{last_user_message, Message, Role};

pub use engine::{
    EngineConfig, EngineError, EngineRuntime, Route, RunOutcome, StepRecord, Termination,
};

pub use session::{
    select_final_answer, AnswerMode, Intent, NextStep, SessionOutcome, SessionState,
    SessionUpdate, StudyWorkflow, StudyWorkflowBuilder, APPROVAL_MARKER, MAX_REVISIONS,
};

pub use agents::{sanitize_user_text, ToolCallParse};

// LLM Provider exports
pub use llm::{
    LLMConfig, LLMProvider, LLMResponse, ModelGateway, OpenAICompatibleProvider,
    ScriptedProvider, TokenUsage,
};

pub use memory::{
    DocumentChunk, DocumentIngestor, EmbeddingProvider, IngestReceipt, LongTermMemory,
    MemoryStore, Note, OpenAICompatibleEmbedder, PdfToText, RetrievedContext, RigEmbedder,
    TextChunker, TextExtractor,
};

pub use tools::{
    CodeSandbox, DuckDuckGoSearch, ProcessSandbox, SearchHit, TavilyError, TavilySearch,
    WebSearch,
};

// Rig compatibility layer exports
pub use compat::RigAgentAdapter;
