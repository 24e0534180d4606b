//! Engine Runtime - sequential executor for workflow graphs
//!
//! Each step follows the sequence: Compute → Merge → Record → Route.
//! The run ends when a vertex routes to END, the state turns terminal, a
//! vertex fails, or the step budget is spent.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::config::EngineConfig;
use super::error::EngineError;
use super::state::WorkflowState;
use super::vertex::{BoxedVertex, ComputeContext, VertexId};

/// Routing decision produced after a vertex finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Continue with the given vertex
    To(VertexId),
    /// Stop the run
    End,
}

impl Route {
    pub fn to(target: impl Into<VertexId>) -> Self {
        Route::To(target.into())
    }
}

type RouteFn<S> = Arc<dyn Fn(&S) -> Route + Send + Sync>;

/// Outgoing transition of a vertex
enum Transition<S> {
    /// Unconditional edge
    Edge(VertexId),
    /// Route chosen from the merged state
    Conditional(RouteFn<S>),
    /// Edge to END
    Finish,
}

/// One executed vertex and the update it produced
#[derive(Debug, Clone)]
pub struct StepRecord<U> {
    /// Step number (0-indexed)
    pub step: usize,
    /// Vertex that ran
    pub vertex_id: VertexId,
    /// Update the vertex returned, before merging
    pub update: U,
}

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Routed to END or reached a terminal state
    Completed,
    /// Step budget reached while `pending` was still scheduled
    BudgetExhausted { max_steps: usize, pending: VertexId },
    /// A vertex failed or timed out
    Aborted { vertex_id: VertexId, reason: String },
}

impl Termination {
    pub fn is_completed(&self) -> bool {
        matches!(self, Termination::Completed)
    }

    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, Termination::BudgetExhausted { .. })
    }
}

/// Result of a workflow execution
#[derive(Debug, Clone)]
pub struct RunOutcome<S: WorkflowState> {
    /// Final workflow state
    pub state: S,
    /// Every executed step in chronological order
    pub steps: Vec<StepRecord<S::Update>>,
    /// How the run ended
    pub termination: Termination,
}

impl<S: WorkflowState> RunOutcome<S> {
    /// Number of executed steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Vertex IDs in execution order
    pub fn visited(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.vertex_id.as_str()).collect()
    }
}

/// Engine Runtime for executing workflow graphs
///
/// The graph is immutable once built, so one runtime can serve many runs.
pub struct EngineRuntime<S>
where
    S: WorkflowState,
{
    /// Configuration for the runtime
    config: EngineConfig,
    /// Vertices in the workflow graph
    vertices: HashMap<VertexId, BoxedVertex<S>>,
    /// Outgoing transition per vertex
    transitions: HashMap<VertexId, Transition<S>>,
    /// Entry vertex ID
    entry_vertex: Option<VertexId>,
}

impl<S> EngineRuntime<S>
where
    S: WorkflowState,
{
    /// Create a new runtime with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            vertices: HashMap::new(),
            transitions: HashMap::new(),
            entry_vertex: None,
        }
    }

    /// Add a vertex to the runtime
    pub fn add_vertex(&mut self, vertex: BoxedVertex<S>) -> &mut Self {
        let id = vertex.id().clone();
        self.vertices.insert(id, vertex);
        self
    }

    /// Add an unconditional edge
    pub fn add_edge(&mut self, from: impl Into<VertexId>, to: impl Into<VertexId>) -> &mut Self {
        self.transitions
            .insert(from.into(), Transition::Edge(to.into()));
        self
    }

    /// Add a conditional transition evaluated against the merged state
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// runtime.add_conditional_edges("router", |state: &MyState| {
    ///     if state.done { Route::End } else { Route::to("worker") }
    /// });
    /// ```
    pub fn add_conditional_edges<F>(&mut self, from: impl Into<VertexId>, route: F) -> &mut Self
    where
        F: Fn(&S) -> Route + Send + Sync + 'static,
    {
        self.transitions
            .insert(from.into(), Transition::Conditional(Arc::new(route)));
        self
    }

    /// Route a vertex straight to END
    pub fn add_finish(&mut self, from: impl Into<VertexId>) -> &mut Self {
        self.transitions.insert(from.into(), Transition::Finish);
        self
    }

    /// Set the entry point
    pub fn set_entry(&mut self, entry: impl Into<VertexId>) -> &mut Self {
        self.entry_vertex = Some(entry.into());
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check that the entry and every fixed edge point at known vertices
    pub fn validate(&self) -> Result<(), EngineError> {
        let entry = self
            .entry_vertex
            .as_ref()
            .ok_or(EngineError::MissingEntry)?;
        if !self.vertices.contains_key(entry) {
            return Err(EngineError::UnknownVertex(entry.clone()));
        }

        for (from, transition) in &self.transitions {
            if !self.vertices.contains_key(from) {
                return Err(EngineError::UnknownVertex(from.clone()));
            }
            if let Transition::Edge(to) = transition {
                if !self.vertices.contains_key(to) {
                    return Err(EngineError::UnknownVertex(to.clone()));
                }
            }
        }
        Ok(())
    }

    /// Run from the entry vertex until END, a terminal state, a vertex
    /// failure, or the step budget.
    ///
    /// Budget exhaustion and vertex failures are reported through
    /// [`Termination`], never as `Err`; only graph-shape problems are errors.
    pub async fn run_to_completion_or_budget(
        &self,
        initial_state: S,
    ) -> Result<RunOutcome<S>, EngineError> {
        self.run_with_budget(initial_state, self.config.max_steps).await
    }

    /// Same as [`run_to_completion_or_budget`](Self::run_to_completion_or_budget)
    /// with a step budget for this run only
    pub async fn run_with_budget(
        &self,
        initial_state: S,
        max_steps: usize,
    ) -> Result<RunOutcome<S>, EngineError> {
        self.validate()?;

        let mut state = initial_state;
        let mut steps: Vec<StepRecord<S::Update>> = Vec::new();
        let mut current = self.entry_vertex.clone();

        while let Some(vertex_id) = current {
            if steps.len() >= max_steps {
                warn!(
                    max_steps,
                    pending = %vertex_id,
                    "Step budget exhausted"
                );
                return Ok(RunOutcome {
                    state,
                    steps,
                    termination: Termination::BudgetExhausted {
                        max_steps,
                        pending: vertex_id,
                    },
                });
            }

            let vertex = self
                .vertices
                .get(&vertex_id)
                .ok_or_else(|| EngineError::UnknownVertex(vertex_id.clone()))?;

            let step = steps.len();
            info!(step, vertex = %vertex_id, "Executing vertex");

            let ctx = ComputeContext::new(vertex_id.clone(), step, &state);
            let result = match timeout(self.config.vertex_timeout, vertex.compute(&ctx)).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::VertexTimeout {
                    vertex_id: vertex_id.clone(),
                    after: self.config.vertex_timeout,
                }),
            };

            let update = match result {
                Ok(update) => update,
                Err(e) if e.is_vertex_failure() => {
                    error!(step, vertex = %vertex_id, error = %e, "Vertex failed, halting run");
                    return Ok(RunOutcome {
                        state,
                        steps,
                        termination: Termination::Aborted {
                            vertex_id,
                            reason: e.to_string(),
                        },
                    });
                }
                Err(e) => return Err(e),
            };

            state = state.apply_update(update.clone());
            steps.push(StepRecord {
                step,
                vertex_id: vertex_id.clone(),
                update,
            });

            if state.is_terminal() {
                debug!(vertex = %vertex_id, "Terminal state reached");
                break;
            }

            current = self.next_vertex(&vertex_id, &state)?;
        }

        Ok(RunOutcome {
            state,
            steps,
            termination: Termination::Completed,
        })
    }

    /// Resolve the transition out of `from`; `None` means END
    fn next_vertex(&self, from: &VertexId, state: &S) -> Result<Option<VertexId>, EngineError> {
        let next = match self.transitions.get(from) {
            None | Some(Transition::Finish) => None,
            Some(Transition::Edge(to)) => Some(to.clone()),
            Some(Transition::Conditional(route)) => match route(state) {
                Route::End => None,
                Route::To(to) => {
                    if !self.vertices.contains_key(&to) {
                        return Err(EngineError::UndeclaredTarget {
                            from: from.clone(),
                            to,
                        });
                    }
                    Some(to)
                }
            },
        };

        if self.config.tracing_enabled {
            match &next {
                Some(to) => debug!(from = %from, to = %to, "Routing"),
                None => debug!(from = %from, "Routing to END"),
            }
        }
        Ok(next)
    }
}

impl<S> Default for EngineRuntime<S>
where
    S: WorkflowState,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::vertex::Vertex;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Clone, Default, Debug)]
    struct TraceState {
        visits: Vec<String>,
        counter: i32,
    }

    #[derive(Clone, Default, Debug)]
    struct TraceUpdate {
        visits: Vec<String>,
        counter: Option<i32>,
    }

    impl WorkflowState for TraceState {
        type Update = TraceUpdate;

        fn apply_update(&self, update: Self::Update) -> Self {
            let mut new = self.clone();
            new.visits.extend(update.visits);
            if let Some(counter) = update.counter {
                new.counter = counter;
            }
            new
        }

        fn is_terminal(&self) -> bool {
            self.counter >= 100
        }
    }

    struct CountingVertex {
        id: VertexId,
        step: i32,
    }

    #[async_trait]
    impl Vertex<TraceState> for CountingVertex {
        fn id(&self) -> &VertexId {
            &self.id
        }

        async fn compute(
            &self,
            ctx: &ComputeContext<'_, TraceState>,
        ) -> Result<TraceUpdate, EngineError> {
            Ok(TraceUpdate {
                visits: vec![self.id.0.clone()],
                counter: Some(ctx.state.counter + self.step),
            })
        }
    }

    struct FailingVertex {
        id: VertexId,
    }

    #[async_trait]
    impl Vertex<TraceState> for FailingVertex {
        fn id(&self) -> &VertexId {
            &self.id
        }

        async fn compute(
            &self,
            _ctx: &ComputeContext<'_, TraceState>,
        ) -> Result<TraceUpdate, EngineError> {
            Err(EngineError::vertex_failed(self.id.clone(), "boom"))
        }
    }

    struct SleepyVertex {
        id: VertexId,
    }

    #[async_trait]
    impl Vertex<TraceState> for SleepyVertex {
        fn id(&self) -> &VertexId {
            &self.id
        }

        async fn compute(
            &self,
            _ctx: &ComputeContext<'_, TraceState>,
        ) -> Result<TraceUpdate, EngineError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(TraceUpdate::default())
        }
    }

    fn counting(id: &str, step: i32) -> BoxedVertex<TraceState> {
        Arc::new(CountingVertex {
            id: VertexId::from(id),
            step,
        })
    }

    #[tokio::test]
    async fn test_linear_graph_completes() {
        let mut runtime = EngineRuntime::new();
        runtime
            .add_vertex(counting("a", 1))
            .add_vertex(counting("b", 2))
            .add_edge("a", "b")
            .add_finish("b")
            .set_entry("a");

        let outcome = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap();

        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.visited(), vec!["a", "b"]);
        assert_eq!(outcome.state.counter, 3);
        assert_eq!(outcome.steps[1].step, 1);
        assert_eq!(outcome.steps[1].update.counter, Some(3));
    }

    #[tokio::test]
    async fn test_conditional_loop_until_end() {
        let mut runtime = EngineRuntime::new();
        runtime
            .add_vertex(counting("inc", 1))
            .add_conditional_edges("inc", |s: &TraceState| {
                if s.counter < 3 {
                    Route::to("inc")
                } else {
                    Route::End
                }
            })
            .set_entry("inc");

        let outcome = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap();

        assert!(outcome.termination.is_completed());
        assert_eq!(outcome.step_count(), 3);
        assert_eq!(outcome.state.visits, vec!["inc", "inc", "inc"]);
    }

    #[tokio::test]
    async fn test_budget_exhausted_keeps_partial_state() {
        let mut runtime = EngineRuntime::with_config(EngineConfig::new().with_max_steps(4));
        runtime
            .add_vertex(counting("spin", 1))
            .add_edge("spin", "spin")
            .set_entry("spin");

        let outcome = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap();

        assert!(outcome.termination.is_budget_exhausted());
        assert_eq!(
            outcome.termination,
            Termination::BudgetExhausted {
                max_steps: 4,
                pending: VertexId::from("spin"),
            }
        );
        assert_eq!(outcome.step_count(), 4);
        assert_eq!(outcome.state.counter, 4);
    }

    #[tokio::test]
    async fn test_per_run_budget_overrides_config() {
        let mut runtime = EngineRuntime::with_config(EngineConfig::new().with_max_steps(50));
        runtime
            .add_vertex(counting("spin", 1))
            .add_edge("spin", "spin")
            .set_entry("spin");

        let outcome = runtime
            .run_with_budget(TraceState::default(), 2)
            .await
            .unwrap();
        assert_eq!(outcome.step_count(), 2);
        assert_eq!(runtime.config().max_steps, 50);
    }

    #[tokio::test]
    async fn test_zero_budget_runs_nothing() {
        let mut runtime = EngineRuntime::with_config(EngineConfig::new().with_max_steps(0));
        runtime.add_vertex(counting("a", 1)).set_entry("a");

        let outcome = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap();

        assert!(outcome.termination.is_budget_exhausted());
        assert!(outcome.steps.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_state_stops_run() {
        let mut runtime = EngineRuntime::new();
        runtime
            .add_vertex(counting("jump", 100))
            .add_edge("jump", "jump")
            .set_entry("jump");

        let outcome = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap();

        assert!(outcome.termination.is_completed());
        assert_eq!(outcome.step_count(), 1);
    }

    #[tokio::test]
    async fn test_vertex_failure_aborts_with_history() {
        let mut runtime = EngineRuntime::new();
        runtime
            .add_vertex(counting("a", 1))
            .add_vertex(Arc::new(FailingVertex {
                id: VertexId::from("bad"),
            }))
            .add_edge("a", "bad")
            .set_entry("a");

        let outcome = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap();

        match &outcome.termination {
            Termination::Aborted { vertex_id, reason } => {
                assert_eq!(vertex_id.as_str(), "bad");
                assert!(reason.contains("boom"));
            }
            other => panic!("unexpected termination: {:?}", other),
        }
        assert_eq!(outcome.visited(), vec!["a"]);
        assert_eq!(outcome.state.counter, 1);
    }

    #[tokio::test]
    async fn test_vertex_timeout_aborts() {
        let config = EngineConfig::new().with_vertex_timeout(Duration::from_millis(20));
        let mut runtime = EngineRuntime::with_config(config);
        runtime
            .add_vertex(Arc::new(SleepyVertex {
                id: VertexId::from("sleepy"),
            }))
            .set_entry("sleepy");

        let outcome = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap();

        match outcome.termination {
            Termination::Aborted { vertex_id, reason } => {
                assert_eq!(vertex_id.as_str(), "sleepy");
                assert!(reason.contains("timeout"));
            }
            other => panic!("unexpected termination: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_entry_is_rejected() {
        let mut runtime: EngineRuntime<TraceState> = EngineRuntime::new();
        runtime.add_vertex(counting("a", 1));

        let err = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingEntry));
    }

    #[tokio::test]
    async fn test_edge_to_unknown_vertex_rejected() {
        let mut runtime = EngineRuntime::new();
        runtime
            .add_vertex(counting("a", 1))
            .add_edge("a", "ghost")
            .set_entry("a");

        let err = runtime.validate().unwrap_err();
        assert!(matches!(err, EngineError::UnknownVertex(id) if id.as_str() == "ghost"));
    }

    #[tokio::test]
    async fn test_conditional_route_to_unknown_vertex() {
        let mut runtime = EngineRuntime::new();
        runtime
            .add_vertex(counting("a", 1))
            .add_conditional_edges("a", |_: &TraceState| Route::to("nowhere"))
            .set_entry("a");

        let err = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UndeclaredTarget { .. }));
    }

    #[tokio::test]
    async fn test_runtime_reusable_across_runs() {
        let mut runtime = EngineRuntime::new();
        runtime.add_vertex(counting("a", 5)).set_entry("a");

        let first = runtime
            .run_to_completion_or_budget(TraceState::default())
            .await
            .unwrap();
        let second = runtime
            .run_to_completion_or_budget(TraceState {
                counter: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(first.state.counter, 5);
        assert_eq!(second.state.counter, 15);
    }
}
