//! Writer: drafts or revises the answer from the research findings

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::prompts::Prompts;
use super::WRITER;
use crate::engine::{ComputeContext, EngineError, Vertex, VertexId};
use crate::llm::ModelGateway;
use crate::memory::LongTermMemory;
use crate::session::{SessionState, SessionUpdate};

/// Related notes pulled into the prompt
const RELATED_NOTES: usize = 2;

pub const EMPTY_DRAFT_PLACEHOLDER: &str = "Draft in progress...";
pub const DRAFT_FAILED: &str = "Error generating draft. Please try again.";

pub struct WriterAgent {
    id: VertexId,
    model: ModelGateway,
    memory: Arc<dyn LongTermMemory>,
}

impl WriterAgent {
    pub fn new(model: ModelGateway, memory: Arc<dyn LongTermMemory>) -> Self {
        Self {
            id: VertexId::from(WRITER),
            model,
            memory,
        }
    }

    async fn related_notes(&self, topic: &str) -> String {
        match self.memory.search_notes(topic, RELATED_NOTES).await {
            Ok(notes) => notes
                .into_iter()
                .map(|n| n.content)
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                warn!(error = %e, "Related-note lookup failed");
                String::new()
            }
        }
    }

    pub async fn write(&self, state: &SessionState) -> String {
        let related = self.related_notes(&state.main_task).await;
        let prompt = Prompts::writer(
            &state.main_task,
            &state.findings_text("\n\n"),
            &state.draft,
            &state.critique_notes,
            state.answer_mode(),
            &related,
        );

        match self.model.complete(&prompt).await {
            Ok(text) if text.is_empty() => EMPTY_DRAFT_PLACEHOLDER.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Draft generation failed");
                DRAFT_FAILED.to_string()
            }
        }
    }

    pub async fn run(&self, state: &SessionState) -> SessionUpdate {
        let draft = self.write(state).await;
        let revision = state.revision_number + 1;
        info!(revision, chars = draft.len(), "Draft written");
        SessionUpdate::drafted(draft, revision)
    }
}

#[async_trait]
impl Vertex<SessionState> for WriterAgent {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;
    use crate::memory::MemoryStore;
    use crate::session::AnswerMode;

    fn writer(provider: &ScriptedProvider, memory: Arc<MemoryStore>) -> WriterAgent {
        WriterAgent::new(ModelGateway::new(Arc::new(provider.clone())), memory)
    }

    fn state() -> SessionState {
        SessionState {
            main_task: "virtual memory paging".into(),
            research_findings: vec!["pages map to frames".into(), "TLB caches entries".into()],
            answer_mode: Some(AnswerMode::Short),
            revision_number: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_draft_increments_revision() {
        let provider = ScriptedProvider::fixed("Paging splits memory into pages.");
        let update = writer(&provider, Arc::new(MemoryStore::in_memory()))
            .run(&state())
            .await;
        assert_eq!(update.draft.as_deref(), Some("Paging splits memory into pages."));
        assert_eq!(update.revision_number, Some(2));

        let prompt = &provider.prompts().await[0];
        assert!(prompt.contains("pages map to frames\n\nTLB caches entries"));
        assert!(prompt.contains("Write at most 3–5 sentences."));
    }

    #[tokio::test]
    async fn test_related_notes_in_prompt() {
        let provider = ScriptedProvider::fixed("draft");
        let memory = Arc::new(MemoryStore::in_memory());
        memory.save_note("vm", "paging avoids external fragmentation", "report").await.unwrap();
        memory.save_note("vm", "virtual memory needs a page table", "report").await.unwrap();
        memory.save_note("vm", "paging uses fixed-size frames", "report").await.unwrap();

        writer(&provider, memory).run(&state()).await;
        let prompt = &provider.prompts().await[0];
        let section = prompt
            .split("Previous long-term notes related to this topic:\n")
            .nth(1)
            .unwrap();
        let notes = section.split("\n\n").next().unwrap();
        assert_eq!(notes.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_empty_reply_placeholder() {
        let provider = ScriptedProvider::fixed("");
        let update = writer(&provider, Arc::new(MemoryStore::in_memory()))
            .run(&state())
            .await;
        assert_eq!(update.draft.as_deref(), Some(EMPTY_DRAFT_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_failure_still_counts_revision() {
        let provider = ScriptedProvider::failing("quota");
        let update = writer(&provider, Arc::new(MemoryStore::in_memory()))
            .run(&state())
            .await;
        assert_eq!(update.draft.as_deref(), Some(DRAFT_FAILED));
        assert_eq!(update.revision_number, Some(2));
    }
}
