//! Final answer selection over the recorded steps

use crate::engine::StepRecord;

use super::state::SessionUpdate;

pub const NO_ANSWER: &str = "I have processed your request, but no answer was produced.";

/// Only `""` is skipped; whitespace counts as content
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Best answer carried by one update, if any
fn answer_in(update: &SessionUpdate) -> Option<&str> {
    non_empty(&update.code_answer)
        .or_else(|| non_empty(&update.quiz_output))
        .or_else(|| non_empty(&update.draft))
        .or_else(|| {
            update
                .research_findings
                .last()
                .map(String::as_str)
                .filter(|s| !s.is_empty())
        })
}

/// Scan newest-first and take the first step that exposes an answer
///
/// Within one step the priority is code answer, quiz output, draft, then the
/// most recent research finding.
pub fn select_final_answer(steps: &[StepRecord<SessionUpdate>]) -> String {
    steps
        .iter()
        .rev()
        .find_map(|step| answer_in(&step.update))
        .unwrap_or(NO_ANSWER)
        .to_string()
}
