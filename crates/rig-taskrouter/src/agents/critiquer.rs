//! Critiquer: approves the draft or asks for another revision
//!
//! Model failures approve the draft so the loop always terminates.

use async_trait::async_trait;
use tracing::{info, warn};

use super::prompts::Prompts;
use super::CRITIQUER;
use crate::engine::{ComputeContext, EngineError, Vertex, VertexId};
use crate::llm::ModelGateway;
use crate::session::{
    contains_approval, NextStep, SessionState, SessionUpdate, APPROVAL_MARKER, MAX_REVISIONS,
};

/// Drafts shorter than this (after trimming) are approved without review
pub const MIN_REVIEW_CHARS: usize = 100;

pub const MINIMAL_DRAFT_APPROVAL: &str = "APPROVED - Draft is minimal but acceptable.";
pub const MAX_REVISIONS_APPROVAL: &str =
    "APPROVED - Maximum revisions reached. The report is satisfactory.";
pub const FAILED_CRITIQUE_APPROVAL: &str =
    "APPROVED - Error in critique, proceeding with current draft.";

pub struct CritiquerAgent {
    id: VertexId,
    model: ModelGateway,
}

impl CritiquerAgent {
    pub fn new(model: ModelGateway) -> Self {
        Self {
            id: VertexId::from(CRITIQUER),
            model,
        }
    }

    /// Review text for the current draft
    pub async fn critique(&self, state: &SessionState) -> String {
        if state.draft.trim().chars().count() < MIN_REVIEW_CHARS {
            return MINIMAL_DRAFT_APPROVAL.to_string();
        }
        if state.revision_number >= MAX_REVISIONS {
            return MAX_REVISIONS_APPROVAL.to_string();
        }

        let prompt = Prompts::critique(&state.main_task, &state.draft);
        match self.model.complete(&prompt).await {
            Ok(text) if text.is_empty() => APPROVAL_MARKER.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Critique failed, approving current draft");
                FAILED_CRITIQUE_APPROVAL.to_string()
            }
        }
    }

    pub async fn run(&self, state: &SessionState) -> SessionUpdate {
        let critique = self.critique(state).await;
        if contains_approval(&critique) {
            info!(revision = state.revision_number, "Draft approved");
            SessionUpdate::critiqued(APPROVAL_MARKER, NextStep::End)
        } else {
            info!(revision = state.revision_number, "Revisions requested");
            SessionUpdate::critiqued(critique, NextStep::Writer)
        }
    }
}

#[async_trait]
impl Vertex<SessionState> for CritiquerAgent {
    fn id(&self) -> &VertexId {
        &self.id
    }

    async fn compute(
        &self,
        ctx: &ComputeContext<'_, SessionState>,
    ) -> Result<SessionUpdate, EngineError> {
        Ok(self.run(ctx.state).await)
    }
}
