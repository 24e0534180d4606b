//! Quiz helper: practice questions or a checklist in one shot

use async_trait::async_trait;
use tracing::{info, warn};

use super::prompts::Prompts;
use super::QUIZ_HELPER;
use crate::engine::{ComputeContext, EngineError, Vertex, VertexId};
use crate::llm::ModelGateway;
use crate::session::{SessionState, SessionUpdate};

pub const QUIZ_FAILED: &str = "Error while generating quiz/checklist. Please try again.";

pub struct QuizHelperAgent {
    id: VertexId,
    model: ModelGateway,
}

impl QuizHelperAgent {
    pub fn new(model: ModelGateway) -> Self {
        Self {
            id: VertexId::from(QUIZ_HELPER),
            model,
        }
    }

    pub async fn generate(&self, state: &SessionState) -> String {
        let prompt = Prompts::quiz(&state.main_task, &state.findings_text("\n\n"));
        match self.model.complete(&prompt).await {
            Ok(output) => {
                info!(chars = output.len(), "Quiz/checklist generated");
                output
            }
            Err(e) => {
                warn!(error = %e, "Quiz generation failed");
                QUIZ_FAILED.to_string()
            }
        }
    }

    pub async fn run(&self, state: &SessionState) -> SessionUpdate {
        SessionUpdate::quiz_output(self.generate(state).await)
    }
}

#[async_trait]
impl Vertex<SessionState> for QuizHelperAgent {
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
