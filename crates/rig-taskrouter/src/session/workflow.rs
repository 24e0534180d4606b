//! The study workflow graph and its entry point
//!
//! # Workflow Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Study Workflow                           │
//! │                                                                  │
//! │                       ┌──────────┐                               │
//! │                       │  router  │                               │
//! │                       └────┬─────┘                               │
//! │          code ┌────────────┼──────────────┐ quiz                 │
//! │               ▼            ▼ research     ▼                      │
//! │       ┌─────────────┐ ┌────────────┐ ┌─────────────┐             │
//! │       │ code_helper │ │ supervisor │ │ quiz_helper │             │
//! │       └──────┬──────┘ └─┬──▲──┬──▲─┘ └──────┬──────┘             │
//! │              │          │  │  │  │          │                    │
//! │              │          ▼  │  ▼  │          │                    │
//! │              │  researcher─┘ writer→critiquer                    │
//! │              │          │                   │                    │
//! │              └──────────┴──────┬────────────┘                    │
//! │                                ▼                                 │
//! │                              END                                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let workflow = StudyWorkflow::builder(ModelGateway::new(provider))
//!     .memory(memory)
//!     .web_search(Arc::new(DuckDuckGoSearch::new(5)))
//!     .build()?;
//!
//! let outcome = workflow.run(vec![Message::user("Explain paging")], 15).await?;
//! println!("{}", outcome.answer);
//! ```

use std::sync::Arc;
use tracing::info;

use super::answer::select_final_answer;
use super::state::{Intent, NextStep, SessionState, SessionUpdate};
use crate::agents::{
    CodeHelperAgent, CritiquerAgent, QuizHelperAgent, ResearcherAgent, RouterAgent,
    SupervisorAgent, WriterAgent, CODE_HELPER, CRITIQUER, QUIZ_HELPER, RESEARCHER, ROUTER,
    SUPERVISOR, WRITER,
};
use crate::engine::{EngineConfig, EngineRuntime, Route, StepRecord, Termination};
use crate::error::TaskRouterError;
use crate::llm::ModelGateway;
use crate::memory::{LongTermMemory, MemoryStore};
use crate::state::Message;
use crate::tools::{CodeSandbox, DuckDuckGoSearch, ProcessSandbox, WebSearch};

/// Web results requested from the default search backend
const DEFAULT_SEARCH_RESULTS: usize = 5;

/// Result of one session run
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Selected final answer
    pub answer: String,
    /// State after the last executed step
    pub final_state: SessionState,
    /// Every executed step in order
    pub steps: Vec<StepRecord<SessionUpdate>>,
    pub termination: Termination,
}

impl SessionOutcome {
    /// Vertex ids in execution order
    pub fn visited(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.vertex_id.as_str()).collect()
    }
}

/// Route out of the router
pub fn route_by_intent(state: &SessionState) -> Route {
    match state.intent.map(Intent::normalized) {
        Some(Intent::Code) => Route::to(CODE_HELPER),
        Some(Intent::Quiz) => Route::to(QUIZ_HELPER),
        _ => Route::to(SUPERVISOR),
    }
}

/// Route out of the supervisor
pub fn route_by_next_step(state: &SessionState) -> Route {
    match state.next_step {
        Some(NextStep::Researcher) => Route::to(RESEARCHER),
        Some(NextStep::Writer) => Route::to(WRITER),
        Some(NextStep::End) | None => Route::End,
    }
}

/// Builder for [`StudyWorkflow`]
///
/// Only the model is required. Memory defaults to an in-process store, web
/// search to DuckDuckGo and the sandbox to local subprocesses.
pub struct StudyWorkflowBuilder {
    model: ModelGateway,
    memory: Option<Arc<dyn LongTermMemory>>,
    web_search: Option<Arc<dyn WebSearch>>,
    sandbox: Option<Arc<dyn CodeSandbox>>,
    engine_config: EngineConfig,
}

impl StudyWorkflowBuilder {
    pub fn new(model: ModelGateway) -> Self {
        Self {
            model,
            memory: None,
            web_search: None,
            sandbox: None,
            engine_config: EngineConfig::default(),
        }
    }

    pub fn memory(mut self, memory: Arc<dyn LongTermMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn web_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(search);
        self
    }

    pub fn sandbox(mut self, sandbox: Arc<dyn CodeSandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// Default step budget and per-vertex timeout
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Wire the workers into the graph
    pub fn build(self) -> Result<StudyWorkflow, TaskRouterError> {
        let memory: Arc<dyn LongTermMemory> = match self.memory {
            Some(memory) => memory,
            None => Arc::new(MemoryStore::in_memory()),
        };
        let web_search: Arc<dyn WebSearch> = match self.web_search {
            Some(search) => search,
            None => Arc::new(DuckDuckGoSearch::new(DEFAULT_SEARCH_RESULTS)),
        };
        let sandbox: Arc<dyn CodeSandbox> = match self.sandbox {
            Some(sandbox) => sandbox,
            None => Arc::new(ProcessSandbox::new()),
        };
        let model = self.model;

        let mut runtime = EngineRuntime::with_config(self.engine_config);
        runtime
            .add_vertex(Arc::new(RouterAgent::new(model.clone())))
            .add_vertex(Arc::new(SupervisorAgent::new(model.clone(), memory.clone())))
            .add_vertex(Arc::new(ResearcherAgent::new(
                model.clone(),
                memory.clone(),
                web_search,
            )))
            .add_vertex(Arc::new(WriterAgent::new(model.clone(), memory.clone())))
            .add_vertex(Arc::new(CritiquerAgent::new(model.clone())))
            .add_vertex(Arc::new(CodeHelperAgent::new(model.clone(), sandbox)))
            .add_vertex(Arc::new(QuizHelperAgent::new(model)))
            .set_entry(ROUTER)
            .add_conditional_edges(ROUTER, route_by_intent)
            .add_conditional_edges(SUPERVISOR, route_by_next_step)
            .add_edge(RESEARCHER, SUPERVISOR)
            .add_edge(WRITER, CRITIQUER)
            .add_edge(CRITIQUER, SUPERVISOR)
            .add_finish(CODE_HELPER)
            .add_finish(QUIZ_HELPER);
        runtime.validate()?;

        Ok(StudyWorkflow { runtime, memory })
    }
}

/// Entry point for one user turn
pub struct StudyWorkflow {
    runtime: EngineRuntime<SessionState>,
    memory: Arc<dyn LongTermMemory>,
}

impl StudyWorkflow {
    pub fn builder(model: ModelGateway) -> StudyWorkflowBuilder {
        StudyWorkflowBuilder::new(model)
    }

    /// Long-term memory shared by the workers
    pub fn memory(&self) -> &Arc<dyn LongTermMemory> {
        &self.memory
    }

    /// Default step budget from the engine config
    pub fn default_max_steps(&self) -> usize {
        self.runtime.config().max_steps
    }

    /// Run one turn over `messages` with at most `max_steps` vertex executions
    ///
    /// Budget exhaustion and worker failures still produce an answer; only a
    /// history without any user message is rejected.
    pub async fn run(
        &self,
        messages: Vec<Message>,
        max_steps: usize,
    ) -> Result<SessionOutcome, TaskRouterError> {
        if !messages.iter().any(Message::is_user) {
            return Err(TaskRouterError::invalid_input("No user message provided."));
        }

        let initial = SessionState::new(messages);
        let outcome = self.runtime.run_with_budget(initial, max_steps).await?;
        let answer = select_final_answer(&outcome.steps);

        info!(
            steps = outcome.step_count(),
            termination = ?outcome.termination,
            revision = outcome.state.revision_number,
            "Session finished"
        );

        Ok(SessionOutcome {
            answer,
            final_state: outcome.state,
            steps: outcome.steps,
            termination: outcome.termination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;

    fn state_with(intent: Option<Intent>, next_step: Option<NextStep>) -> SessionState {
        SessionState {
            intent,
            next_step,
            ..Default::default()
        }
    }

    #[test]
    fn test_route_by_intent() {
        assert_eq!(route_by_intent(&state_with(Some(Intent::Code), None)), Route::to(CODE_HELPER));
        assert_eq!(route_by_intent(&state_with(Some(Intent::Quiz), None)), Route::to(QUIZ_HELPER));
        assert_eq!(route_by_intent(&state_with(Some(Intent::General), None)), Route::to(SUPERVISOR));
        assert_eq!(route_by_intent(&state_with(None, None)), Route::to(SUPERVISOR));
    }

    #[test]
    fn test_route_by_next_step() {
        assert_eq!(
            route_by_next_step(&state_with(None, Some(NextStep::Researcher))),
            Route::to(RESEARCHER)
        );
        assert_eq!(
            route_by_next_step(&state_with(None, Some(NextStep::Writer))),
            Route::to(WRITER)
        );
        assert_eq!(route_by_next_step(&state_with(None, Some(NextStep::End))), Route::End);
        assert_eq!(route_by_next_step(&state_with(None, None)), Route::End);
    }

    #[tokio::test]
    async fn test_rejects_history_without_user_message() {
        let workflow = StudyWorkflow::builder(ModelGateway::new(Arc::new(ScriptedProvider::fixed("x"))))
            .build()
            .unwrap();

        let err = workflow
            .run(vec![Message::assistant("hello")], 15)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: No user message provided.");

        assert!(workflow.run(vec![], 15).await.is_err());
    }

    #[tokio::test]
    async fn test_quiz_path_is_two_steps() {
        let provider = ScriptedProvider::new(|prompt| {
            if prompt.starts_with("You are a routing assistant") {
                Ok(r#"{"intent": "quiz", "answer_mode": "short"}"#.into())
            } else {
                Ok("1. Question".into())
            }
        });
        let workflow = StudyWorkflow::builder(ModelGateway::new(Arc::new(provider)))
            .build()
            .unwrap();

        let outcome = workflow
            .run(vec![Message::user("Quiz me on paging")], 15)
            .await
            .unwrap();
        assert_eq!(outcome.visited(), vec![ROUTER, QUIZ_HELPER]);
        assert_eq!(outcome.answer, "1. Question");
        assert!(outcome.termination.is_completed());
    }
}
