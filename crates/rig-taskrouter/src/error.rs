// src/error.rs
//! Error types for the task router
//!
//! Every worker converts these into a local fallback value before the state
//! machine sees them; only entry-point validation reaches the caller.

use thiserror::Error;

use crate::engine::EngineError;

/// Top-level error for the task router
#[derive(Error, Debug)]
pub enum TaskRouterError {
    /// Language-model call failed or timed out
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Router or supervisor JSON failed to parse or validate
    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    /// Memory or web search failed
    #[error("Retrieval failure: {0}")]
    RetrievalFailure(String),

    /// Sandbox candidate matched the deny-list
    #[error("Execution refused: {0}")]
    ExecutionRefused(String),

    /// Program or compiler failed, or the sandbox timed out
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Step ceiling reached before a terminal state
    #[error("Step budget exhausted after {0} steps")]
    BudgetExhausted(usize),

    /// Caller input rejected at the entry boundary
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl TaskRouterError {
    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable(message.into())
    }

    pub fn malformed_decision(message: impl Into<String>) -> Self {
        Self::MalformedDecision(message.into())
    }

    pub fn retrieval_failure(message: impl Into<String>) -> Self {
        Self::RetrievalFailure(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
