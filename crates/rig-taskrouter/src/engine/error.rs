//! Engine errors
//!
//! Two kinds: graph-shape mistakes, which are programming errors and fail the
//! run, and per-vertex failures, which the runtime turns into
//! [`Termination::Aborted`](super::Termination::Aborted).

use std::time::Duration;
use thiserror::Error;

use super::vertex::VertexId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Graph has no entry vertex")]
    MissingEntry,

    /// Referenced by an edge or the entry but never added
    #[error("Unknown vertex: {0}")]
    UnknownVertex(VertexId),

    /// A conditional route picked a vertex that is not in the graph
    #[error("Vertex {from} routed to undeclared vertex {to}")]
    UndeclaredTarget { from: VertexId, to: VertexId },

    #[error("Vertex timeout in {vertex_id} after {after:?}")]
    VertexTimeout { vertex_id: VertexId, after: Duration },

    #[error("Vertex {vertex_id} failed: {reason}")]
    VertexFailed { vertex_id: VertexId, reason: String },
}

impl EngineError {
    pub fn vertex_failed(vertex_id: impl Into<VertexId>, reason: impl Into<String>) -> Self {
        Self::VertexFailed {
            vertex_id: vertex_id.into(),
            reason: reason.into(),
        }
    }

    /// Failures local to one vertex; the run halts but answer selection still happens
    pub fn is_vertex_failure(&self) -> bool {
        matches!(
            self,
            EngineError::VertexTimeout { .. } | EngineError::VertexFailed { .. }
        )
    }
}
