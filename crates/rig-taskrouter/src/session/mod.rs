//! One user turn through the study workflow
//!
//! - [`SessionState`] / [`SessionUpdate`]: the shared record and its per-step delta
//! - [`StudyWorkflow`]: builds the graph and runs a turn to completion or budget
//! - [`select_final_answer`]: picks the user-facing answer from the recorded steps

pub mod answer;
pub mod state;
pub mod workflow;

pub use answer::{select_final_answer, NO_ANSWER};
pub use state::{
    contains_approval, AnswerMode, Intent, NextStep, SessionState, SessionUpdate,
    APPROVAL_MARKER, MAX_REVISIONS,
};
pub use workflow::{
    route_by_intent, route_by_next_step, SessionOutcome, StudyWorkflow, StudyWorkflowBuilder,
};
