//! Vertices: the router, the supervisor and each worker are one vertex apiece

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::error::EngineError;
use super::state::WorkflowState;

/// Name of a vertex, e.g. `"supervisor"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub String);

impl VertexId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a vertex sees while it runs: the state as of the previous step
pub struct ComputeContext<'a, S> {
    pub state: &'a S,
    /// Zero-based index of this step within the run
    pub step: usize,
    vertex_id: VertexId,
}

impl<'a, S> ComputeContext<'a, S> {
    pub fn new(vertex_id: VertexId, step: usize, state: &'a S) -> Self {
        Self {
            state,
            step,
            vertex_id,
        }
    }

    pub fn id(&self) -> &VertexId {
        &self.vertex_id
    }
}

/// One unit of work in the graph
///
/// A vertex reads the state and returns an update; it never mutates the state
/// itself and never decides where the run goes next. Routing is the graph's
/// job.
#[async_trait]
pub trait Vertex<S>: Send + Sync
where
    S: WorkflowState,
{
    fn id(&self) -> &VertexId;

    async fn compute(&self, ctx: &ComputeContext<'_, S>) -> Result<S::Update, EngineError>;
}

pub type BoxedVertex<S> = Arc<dyn Vertex<S>>;
