//! Prompt templates for the workers
//!
//! One function per model call. Inputs are already sanitized and formatted;
//! empty sections are replaced with the placeholders shown in each template.

use crate::session::AnswerMode;

/// Prompt templates for the study workflow
pub struct Prompts;

impl Prompts {
    /// Router classification prompt
    pub fn router(user_message: &str) -> String {
        format!(
            r#"You are a routing assistant for a multi-agent system.
Classify the user's request along two axes:
1) INTENT: Decide if the MAIN GOAL of the message is about:
   - PROGRAMMING CODE (writing, debugging, running code),
   - QUIZ/CHECKLIST generation (practice questions, flashcards, to-do steps), or
   - GENERAL/RESEARCH content.
   - Choose "code" ONLY if the user primarily wants code or code execution.
   - Choose "quiz" if the user mainly wants a quiz, practice questions, flashcards, or a checklist of steps.
   - Otherwise choose "research".
2) ANSWER MODE: SHORT vs LONG explanation.
   - Use "short" for brief answers or summaries.
   - Use "long" for detailed explanations or reports.

Return ONLY a JSON object with exactly these keys:
{{"intent": "code" | "research" | "general" | "quiz", "answer_mode": "short" | "long"}}

User message:
{user_message}
"#
        )
    }

    /// Supervisor fallback when no rule matched
    pub fn supervisor(
        main_task: &str,
        research_findings: &str,
        draft: &str,
        critique_notes: &str,
        revision_number: u32,
    ) -> String {
        format!(
            r#"You are a project supervisor managing a research workflow.

Current Task: {main_task}

Current State:
- Research Findings: {research_findings}
- Draft Status: {draft}
- Critique Notes: {critique_notes}
- Revision Number: {revision_number}

Based on the current state, decide the next step. Respond with ONLY a JSON object (no other text):

{{
  "next_step": "researcher" or "writer" or "END",
  "task_description": "Brief description of what needs to be done"
}}

Decision Rules:
- If no research exists, choose "researcher"
- If research exists but no draft, choose "writer"
- If draft exists and critique says "APPROVED", choose "END"
- If draft needs revision, choose "writer"
- If revision_number >= 3, choose "END"
"#
        )
    }

    /// Summary stored in long-term memory after approval
    pub fn report_summary(draft: &str) -> String {
        format!("Summarize this report in 5-7 bullet points for future reuse:\n{draft}")
    }

    /// Researcher prompt for short factual questions
    pub fn quick_answer(query: &str, memory_context: &str, document_context: &str) -> String {
        format!(
            r#"You are a concise teaching assistant. Answer the question: "{query}".

Use these sources if relevant:

1) Long‑term notes from previous sessions:
{memory}

2) Local notes (uploaded PDFs):
{documents}

Write a short answer of 3–5 sentences, directly addressing the question. Avoid long reports, headings, or bullet lists."#,
            memory = or_placeholder(memory_context, "(no prior notes found)"),
            documents = or_placeholder(document_context, "(no relevant notes found)"),
        )
    }

    /// Researcher prompt when web results are included
    pub fn deep_research(
        query: &str,
        memory_context: &str,
        document_context: &str,
        web_results: &str,
    ) -> String {
        format!(
            r#"You are a research assistant. Summarize key findings for the question: "{query}".

You have three sources of information:

1) Long‑term notes from previous sessions:
{memory}

2) Local notes (uploaded PDFs):
{documents}

3) Web search results:
{web_results}

Write a concise, well‑structured summary (5–10 bullet points) that:
- First reuses relevant long‑term notes when they match the question.
- Then incorporates important details from local notes.
- Finally supplements with web results only if they add new value."#,
            memory = or_placeholder(memory_context, "(no prior notes found)"),
            documents = or_placeholder(document_context, "(no relevant notes found)"),
        )
    }

    /// Writer prompt for a first draft or a revision
    pub fn writer(
        main_task: &str,
        research_findings: &str,
        draft: &str,
        critique_notes: &str,
        answer_mode: AnswerMode,
        related_notes: &str,
    ) -> String {
        let length_rules = match answer_mode {
            AnswerMode::Short => {
                "- The user requested a brief answer.\n\
                 - Write at most 3–5 sentences.\n\
                 - Do NOT create long sections or headings.\n\
                 - Focus only on the most important points.\n"
            }
            AnswerMode::Long => {
                "- The user requested a detailed explanation/report.\n\
                 - You may write a longer answer with multiple paragraphs.\n\
                 - Use sections like Introduction / Main Findings / Analysis / Conclusion when helpful.\n"
            }
        };

        let mut prompt = format!(
            r#"You are a professional research writer.

Main Task: {main_task}

Research Findings:
{findings}

Current Draft: {draft}

Critique Notes: {critique_notes}

General instructions:
- Use a clear, academic but readable tone.
- Do not repeat research findings verbatim; synthesize them.
- Only include information supported by the findings.

Answer length and structure rules:
{length_rules}
"#,
            findings = or_placeholder(research_findings, "No research available."),
        );

        if !related_notes.is_empty() {
            prompt.push_str(&format!(
                "\nPrevious long-term notes related to this topic:\n{related_notes}\n\n\
                 Reuse relevant insights from these notes when it improves the answer.\n"
            ));
        }

        prompt.push_str("Write the response for the user now:\n");
        prompt
    }

    /// Critiquer review prompt
    pub fn critique(main_task: &str, draft: &str) -> String {
        format!(
            r#"You are a critical reviewer evaluating a research report.

Main Task: {main_task}

Draft to Review:
{draft}

Evaluate the draft based on:
1. Completeness - Does it cover the topic thoroughly?
2. Accuracy - Is the information well-researched?
3. Structure - Is it well-organized with clear sections?
4. Clarity - Is it easy to understand?
5. Depth - Does it provide meaningful analysis?

Provide your evaluation:
- If the draft is satisfactory (minor issues are okay), respond with: "APPROVED - [brief positive comment]"
- If the draft needs improvement, provide specific, actionable feedback for revision

Your response:
"#
        )
    }

    /// Code helper prompt; the tool line format is parsed by the code helper
    pub fn code_helper(snippet: &str, question: &str) -> String {
        format!(
            r#"You are a careful coding assistant. The user may provide or request code in Python, C, or C++.
1) Explain the answer to the user's question with clear reasoning and example code.
2) ONLY if the user explicitly asked to run/execute code AND the code is short and safe (no networking, file system, shell access, or imports besides the standard library), you may request execution via a tool call.

Existing code snippet (may be empty):
{snippet}

Tool interface:
run_code(code: str, language: one of [python, c, cpp])

User question:
{question}

First, answer the user in natural language.
On the LAST LINE, optionally include a JSON object with a tool call of the form:
{{"tool": "run_code", "language": "python" | "c" | "cpp", "code": "..."}}
If you do not want to run code, simply omit the JSON line.
"#
        )
    }

    /// Quiz or checklist prompt
    pub fn quiz(topic: &str, background: &str) -> String {
        let mut prompt = format!("You are a helpful teaching assistant.\n\nTopic: {topic}\n\n");

        if !background.is_empty() {
            prompt.push_str(&format!(
                "Here is some background material on the topic that you may use:\n{background}\n\n"
            ));
        }

        prompt.push_str(
            r#"The user wants either a quiz OR a checklist depending on their wording.

If the user asked for a QUIZ (practice questions, flashcards, test):
- Create 8–10 diverse questions (mix of short-answer and multiple choice).
- Number the questions.
- After the questions, provide an answer key.

If the user asked for a CHECKLIST, plan, or steps:
- Create a clear, ordered checklist of 8–12 items.
- Each item should be a concrete, actionable step.

Always answer in Markdown. Do NOT ask the user to clarify; infer quiz vs checklist from their original request.

Now generate the quiz or checklist:
"#,
        );
        prompt
    }
}

fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.is_empty() {
        placeholder
    } else {
        text
    }
}
