//! Code helper: explains code and, when explicitly asked, runs it
//!
//! The model may end its reply with a single JSON tool line:
//!
//! ```text
//! {"tool": "run_code", "language": "python", "code": "print(1)"}
//! ```
//!
//! The line is only honoured if the user's own question asked for execution,
//! and the candidate code passes the deny-list.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::prompts::Prompts;
use super::sanitize::sanitize_user_text;
use super::CODE_HELPER;
use crate::engine::{ComputeContext, EngineError, Vertex, VertexId};
use crate::error::TaskRouterError;
use crate::llm::ModelGateway;
use crate::session::{SessionState, SessionUpdate};
use crate::tools::{CodeSandbox, Language};

/// Phrases in the user's question that allow execution
pub const RUN_PHRASES: [&str; 6] = [
    "run this code",
    "execute this code",
    "run the above code",
    "execute the above code",
    "run it",
    "execute it",
];

/// Substrings that block execution outright
pub const BANNED_SUBSTRINGS: [&str; 6] = [
    "import os",
    "import sys",
    "subprocess",
    "shutil",
    "socket",
    "open(",
];

pub const REFUSAL: &str =
    "Refused to execute code because it uses potentially dangerous operations.";
pub const CODE_ANSWER_FAILED: &str = "Error while generating code answer.";

/// Outcome of inspecting the last line of a model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallParse {
    /// No candidate tool line
    NoToolCall,
    /// Valid `run_code` call
    ParsedToolCall { language: Language, code: String },
    /// Candidate line that failed to parse or validate
    ParseError(String),
}

#[derive(Deserialize)]
struct RunCodeCall {
    tool: String,
    #[serde(default = "default_language")]
    language: String,
    code: String,
}

fn default_language() -> String {
    "python".to_string()
}

impl ToolCallParse {
    /// Inspect the last non-empty line of `reply`
    pub fn from_reply(reply: &str) -> Self {
        let last = reply.trim().lines().last().unwrap_or_default().trim();
        if !(last.starts_with('{') && last.contains("\"tool\"")) {
            return Self::NoToolCall;
        }

        let call: RunCodeCall = match serde_json::from_str(last) {
            Ok(call) => call,
            Err(e) => return Self::ParseError(e.to_string()),
        };
        if call.tool != "run_code" {
            return Self::ParseError(format!("unknown tool: {}", call.tool));
        }
        match Language::parse(&call.language) {
            Some(language) => Self::ParsedToolCall {
                language,
                code: call.code,
            },
            None => Self::ParseError(format!("unsupported language: {}", call.language)),
        }
    }
}

/// Reply without its last line
fn strip_last_line(reply: &str) -> String {
    let lines: Vec<&str> = reply.trim().lines().collect();
    lines[..lines.len().saturating_sub(1)].join("\n")
}

/// True if the user explicitly asked for execution
pub fn wants_execution(question: &str) -> bool {
    let lowered = question.to_lowercase();
    RUN_PHRASES.iter().any(|p| lowered.contains(p))
}

/// Deny-list check; applies regardless of language
pub fn check_code(code: &str) -> Result<(), TaskRouterError> {
    match BANNED_SUBSTRINGS.iter().find(|b| code.contains(**b)) {
        Some(banned) => Err(TaskRouterError::ExecutionRefused(format!(
            "code contains `{}`",
            banned
        ))),
        None => Ok(()),
    }
}

pub struct CodeHelperAgent {
    id: VertexId,
    model: ModelGateway,
    sandbox: Arc<dyn CodeSandbox>,
}

impl CodeHelperAgent {
    pub fn new(model: ModelGateway, sandbox: Arc<dyn CodeSandbox>) -> Self {
        Self {
            id: VertexId::from(CODE_HELPER),
            model,
            sandbox,
        }
    }

    pub async fn answer(&self, state: &SessionState) -> String {
        let question = if state.code_question.is_empty() {
            state.main_task.as_str()
        } else {
            state.code_question.as_str()
        };
        let snippet = if state.code_snippet.is_empty() {
            state.code_answer.as_str()
        } else {
            state.code_snippet.as_str()
        };

        let prompt = Prompts::code_helper(snippet, &sanitize_user_text(question));
        let reply = match self.model.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Code answer generation failed");
                return CODE_ANSWER_FAILED.to_string();
            }
        };

        let (explanation, call) = match ToolCallParse::from_reply(&reply) {
            ToolCallParse::ParsedToolCall { language, code } => {
                (strip_last_line(&reply), Some((language, code)))
            }
            ToolCallParse::ParseError(reason) => {
                warn!(%reason, "Ignoring malformed tool line");
                (reply, None)
            }
            ToolCallParse::NoToolCall => (reply, None),
        };

        let Some((language, code)) = call else {
            return explanation;
        };
        if !wants_execution(question) {
            debug!("Tool call present but execution was not requested");
            return explanation;
        }

        let candidate = if code.is_empty() { snippet } else { code.as_str() };
        let output = match check_code(candidate) {
            Ok(()) => {
                info!(language = language.as_str(), "Executing code");
                self.sandbox.execute(candidate, language.as_str()).await
            }
            Err(e) => {
                warn!(error = %e, "Execution refused");
                REFUSAL.to_string()
            }
        };

        if output.is_empty() {
            explanation
        } else {
            format!("{}\n\nExecution result:\n{}", explanation, output)
        }
    }

    pub async fn run(&self, state: &SessionState) -> SessionUpdate {
        SessionUpdate::code_answer(self.answer(state).await)
    }
}

#[async_trait]
impl Vertex<SessionState> for CodeHelperAgent {
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
