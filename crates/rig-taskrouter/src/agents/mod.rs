//! Specialist workers of the study workflow
//!
//! Each worker is a [`Vertex`](crate::engine::Vertex) over
//! [`SessionState`](crate::session::SessionState) whose `run` never fails:
//! model, memory, search and sandbox errors all turn into fallback text.
//!
//! | vertex        | reads                                   | writes                         |
//! |---------------|-----------------------------------------|--------------------------------|
//! | `router`      | last user message                       | intent, answer_mode, main_task |
//! | `supervisor`  | findings, draft, critique, revision     | next_step, current_sub_task    |
//! | `researcher`  | current_sub_task                        | one research finding           |
//! | `writer`      | task, findings, draft, critique, mode   | draft, revision_number         |
//! | `critiquer`   | draft, revision_number                  | critique_notes, next_step      |
//! | `code_helper` | code_question, code_snippet             | code_answer                    |
//! | `quiz_helper` | main_task, findings                     | quiz_output                    |

pub mod code_helper;
pub mod critiquer;
pub mod prompts;
pub mod quiz_helper;
pub mod researcher;
pub mod router;
pub mod sanitize;
pub mod supervisor;
pub mod writer;

pub use code_helper::{CodeHelperAgent, ToolCallParse};
pub use critiquer::CritiquerAgent;
pub use prompts::Prompts;
pub use quiz_helper::QuizHelperAgent;
pub use researcher::{ResearchDepth, ResearcherAgent};
pub use router::{RouterAgent, RouterDecision};
pub use sanitize::sanitize_user_text;
pub use supervisor::{Decision, Rule, SupervisorAgent};
pub use writer::WriterAgent;

pub const ROUTER: &str = "router";
pub const SUPERVISOR: &str = "supervisor";
pub const RESEARCHER: &str = "researcher";
pub const WRITER: &str = "writer";
pub const CRITIQUER: &str = "critiquer";
pub const CODE_HELPER: &str = "code_helper";
pub const QUIZ_HELPER: &str = "quiz_helper";
