//! Session state for one user turn
//!
//! Implements `WorkflowState` for the router → supervisor loop:
//! - `messages` and `research_findings` only ever grow
//! - every other field is overwritten when an update carries it and kept otherwise

use serde::{Deserialize, Serialize};

use crate::engine::WorkflowState;
use crate::state::{last_user_message, Message};

/// Writer invocations allowed before the loop is forced to finish
pub const MAX_REVISIONS: u32 = 3;

/// Marker the critiquer stores when a draft is accepted
pub const APPROVAL_MARKER: &str = "APPROVED";

/// What the user wants from this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Code,
    #[default]
    Research,
    General,
    Quiz,
}

impl Intent {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "code" => Some(Self::Code),
            "research" => Some(Self::Research),
            "general" => Some(Self::General),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }

    /// `general` is handled by the research pipeline
    pub fn normalized(self) -> Self {
        match self {
            Self::General => Self::Research,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Research => "research",
            Self::General => "general",
            Self::Quiz => "quiz",
        }
    }
}

/// Requested verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Short,
    #[default]
    Long,
}

impl AnswerMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "short" => Some(Self::Short),
            "long" => Some(Self::Long),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

/// Routing signal written by the supervisor and the critiquer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NextStep {
    #[serde(rename = "researcher")]
    Researcher,
    #[serde(rename = "writer")]
    Writer,
    #[serde(rename = "END")]
    End,
}

impl NextStep {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "researcher" => Some(Self::Researcher),
            "writer" => Some(Self::Writer),
            "END" => Some(Self::End),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Writer => "writer",
            Self::End => "END",
        }
    }
}

/// The complete state of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Conversation history, oldest first
    pub messages: Vec<Message>,

    /// Set once by the router
    pub intent: Option<Intent>,

    /// Set once by the router, read by the writer
    pub answer_mode: Option<AnswerMode>,

    /// The user text this run is about
    pub main_task: String,

    /// One entry per researcher step
    pub research_findings: Vec<String>,

    /// Current best draft
    pub draft: String,

    /// Latest critique, or [`APPROVAL_MARKER`]
    pub critique_notes: String,

    /// Number of writer invocations so far
    pub revision_number: u32,

    /// Consumed by the transition out of the supervisor
    pub next_step: Option<NextStep>,

    /// Instruction for the next researcher or writer step
    pub current_sub_task: String,

    pub code_question: String,
    pub code_snippet: String,
    pub code_answer: String,

    /// Terminal output of the quiz/checklist path
    pub quiz_output: String,
}

impl SessionState {
    /// Fresh state for a turn, seeded from the last user message
    pub fn new(messages: Vec<Message>) -> Self {
        let last = last_user_message(&messages).unwrap_or_default().to_string();
        Self {
            main_task: last.clone(),
            code_question: last,
            messages,
            ..Default::default()
        }
    }

    pub fn last_user_message(&self) -> Option<&str> {
        last_user_message(&self.messages)
    }

    pub fn has_research(&self) -> bool {
        !self.research_findings.is_empty()
    }

    pub fn has_draft(&self) -> bool {
        !self.draft.trim().is_empty()
    }

    pub fn has_critique(&self) -> bool {
        !self.critique_notes.is_empty()
    }

    /// Case-insensitive check for the approval marker
    pub fn is_approved(&self) -> bool {
        contains_approval(&self.critique_notes)
    }

    pub fn answer_mode(&self) -> AnswerMode {
        self.answer_mode.unwrap_or_default()
    }

    /// Findings joined for prompts
    pub fn findings_text(&self, separator: &str) -> String {
        self.research_findings.join(separator)
    }
}

/// True if `text` contains the approval marker in any case
pub fn contains_approval(text: &str) -> bool {
    text.to_uppercase().contains(APPROVAL_MARKER)
}

/// Delta produced by one vertex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// Messages to append
    pub messages: Vec<Message>,
    /// Findings to append
    pub research_findings: Vec<String>,

    pub intent: Option<Intent>,
    pub answer_mode: Option<AnswerMode>,
    pub main_task: Option<String>,
    pub draft: Option<String>,
    pub critique_notes: Option<String>,
    pub revision_number: Option<u32>,
    pub next_step: Option<NextStep>,
    pub current_sub_task: Option<String>,
    pub code_question: Option<String>,
    pub code_snippet: Option<String>,
    pub code_answer: Option<String>,
    pub quiz_output: Option<String>,
}

impl SessionUpdate {
    /// Router output
    pub fn routed(intent: Intent, answer_mode: AnswerMode) -> Self {
        Self {
            intent: Some(intent),
            answer_mode: Some(answer_mode),
            ..Default::default()
        }
    }

    /// Supervisor output
    pub fn next(next_step: NextStep, task_description: impl Into<String>) -> Self {
        Self {
            next_step: Some(next_step),
            current_sub_task: Some(task_description.into()),
            ..Default::default()
        }
    }

    /// Researcher output
    pub fn finding(finding: impl Into<String>) -> Self {
        Self {
            research_findings: vec![finding.into()],
            ..Default::default()
        }
    }

    /// Writer output
    pub fn drafted(draft: impl Into<String>, revision_number: u32) -> Self {
        Self {
            draft: Some(draft.into()),
            revision_number: Some(revision_number),
            ..Default::default()
        }
    }

    /// Critiquer output
    pub fn critiqued(critique_notes: impl Into<String>, next_step: NextStep) -> Self {
        Self {
            critique_notes: Some(critique_notes.into()),
            next_step: Some(next_step),
            ..Default::default()
        }
    }

    pub fn code_answer(answer: impl Into<String>) -> Self {
        Self {
            code_answer: Some(answer.into()),
            ..Default::default()
        }
    }

    pub fn quiz_output(output: impl Into<String>) -> Self {
        Self {
            quiz_output: Some(output.into()),
            ..Default::default()
        }
    }

    /// Also overwrite `main_task` and `code_question`
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        let task = task.into();
        self.code_question = Some(task.clone());
        self.main_task = Some(task);
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

fn overwrite<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl WorkflowState for SessionState {
    type Update = SessionUpdate;

    fn apply_update(&self, update: Self::Update) -> Self {
        let mut new_state = self.clone();

        new_state.messages.extend(update.messages);
        new_state.research_findings.extend(update.research_findings);

        if update.intent.is_some() {
            new_state.intent = update.intent;
        }
        if update.answer_mode.is_some() {
            new_state.answer_mode = update.answer_mode;
        }
        if update.next_step.is_some() {
            new_state.next_step = update.next_step;
        }
        overwrite(&mut new_state.main_task, update.main_task);
        overwrite(&mut new_state.draft, update.draft);
        overwrite(&mut new_state.critique_notes, update.critique_notes);
        overwrite(&mut new_state.revision_number, update.revision_number);
        overwrite(&mut new_state.current_sub_task, update.current_sub_task);
        overwrite(&mut new_state.code_question, update.code_question);
        overwrite(&mut new_state.code_snippet, update.code_snippet);
        overwrite(&mut new_state.code_answer, update.code_answer);
        overwrite(&mut new_state.quiz_output, update.quiz_output);

        new_state
    }
}
