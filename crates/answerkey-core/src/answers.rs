//! Mapping unstructured recognized text onto questions.
//!
//! The n-th non-blank line answers the n-th question. The scorers never
//! depend on this module.

use crate::model::{Question, StudentAnswers};

/// Assign non-blank lines of `text` to `questions` in order.
///
/// Lines are trimmed. Surplus lines are dropped; questions without a line
/// are left unanswered.
pub fn map_lines_to_questions(text: &str, questions: &[Question]) -> StudentAnswers {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let answers: StudentAnswers = questions
        .iter()
        .map_while(|question| lines.next().map(|line| (question.id.clone(), line.to_string())))
        .collect();

    let surplus = lines.count();
    if surplus > 0 {
        tracing::debug!(surplus, "recognized text has more lines than questions");
    }
    if answers.len() < questions.len() {
        tracing::debug!(
            answered = answers.len(),
            questions = questions.len(),
            "recognized text has fewer lines than questions"
        );
    }

    answers
}
