//! Sequential state-machine runtime for agent workflows
//!
//! A single run walks the graph one vertex at a time:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     EngineRuntime                        │
//! │  ┌───────┐   ┌───────┐   ┌───────┐                       │
//! │  │ step 0│ → │ step 1│ → │ step 2│ → ... → END | budget  │
//! │  └───────┘   └───────┘   └───────┘                       │
//! │      │           │           │                           │
//! │      ▼           ▼           ▼                           │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │ Per-step: Compute → Merge update → Record → Route  │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Vertex**: one computation unit (router, supervisor, worker)
//! - **Transition**: fixed edge, conditional route, or finish
//! - **Step budget**: maximum vertex executions per run; reaching it ends the
//!   run as [`Termination::BudgetExhausted`] instead of failing

pub mod config;
pub mod error;
pub mod runtime;
pub mod state;
pub mod vertex;

pub use config::EngineConfig;
pub use error::EngineError;
pub use runtime::{EngineRuntime, Route, RunOutcome, StepRecord, Termination};
pub use state::WorkflowState;
pub use vertex::{BoxedVertex, ComputeContext, Vertex, VertexId};
