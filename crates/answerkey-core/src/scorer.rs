//! Deterministic, explainable answer scoring.
//!
//! Choice questions are exact (trimmed, case-insensitive) matches. Free-text
//! questions earn `similarity x weight`, where short answers get a generosity
//! floor once they cross a similarity threshold and long answers and essays
//! do not.

use std::collections::BTreeMap;

use crate::model::{GradingMethod, GradingOutcome, Question, QuestionType, StudentAnswers};
use crate::similarity::similarity;

/// Raw similarity a short answer must exceed before the floor applies.
pub const SHORT_ANSWER_THRESHOLD: f64 = 0.3;

/// Minimum adjusted similarity for short answers above the threshold.
pub const SHORT_ANSWER_FLOOR: f64 = 0.4;

/// Breakdown of how a single question was scored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionScore {
    /// Similarity to the reference answer (1.0 or 0.0 for choice questions).
    pub raw_similarity: f64,
    /// Similarity after per-type post-processing.
    pub adjusted_similarity: f64,
    /// Points awarded.
    pub score: f64,
}

/// Apply the per-type post-processing to a raw similarity.
pub fn adjust_similarity(question_type: QuestionType, raw: f64) -> f64 {
    match question_type {
        QuestionType::ShortAnswer if raw > SHORT_ANSWER_THRESHOLD => raw.max(SHORT_ANSWER_FLOOR),
        QuestionType::ShortAnswer
        | QuestionType::Choice
        | QuestionType::LongAnswer
        | QuestionType::Essay => raw,
    }
}

/// Whether a choice answer matches the reference, ignoring case and surrounding whitespace.
pub fn choice_matches(answer: &str, reference: &str) -> bool {
    answer.trim().to_lowercase() == reference.trim().to_lowercase()
}

/// Score one answer against its question.
pub fn score_question(question: &Question, answer: &str) -> QuestionScore {
    let raw_similarity = match question.question_type {
        QuestionType::Choice => {
            if choice_matches(answer, &question.reference_answer) {
                1.0
            } else {
                0.0
            }
        }
        QuestionType::ShortAnswer | QuestionType::LongAnswer | QuestionType::Essay => {
            similarity(answer, &question.reference_answer)
        }
    };
    let adjusted_similarity = adjust_similarity(question.question_type, raw_similarity);

    QuestionScore {
        raw_similarity,
        adjusted_similarity,
        score: adjusted_similarity * question.weight,
    }
}

fn feedback_for(question: &Question, answer: &str, scored: &QuestionScore) -> String {
    if answer.trim().is_empty() {
        return "No answer given.".to_string();
    }

    match question.question_type {
        QuestionType::Choice if scored.raw_similarity >= 1.0 => "Correct.".to_string(),
        QuestionType::Choice => {
            let mut msg = format!("Incorrect. Expected: {}.", question.reference_answer.trim());
            if let Some(explanation) = &question.explanation {
                msg.push(' ');
                msg.push_str(explanation);
            }
            msg
        }
        QuestionType::ShortAnswer | QuestionType::LongAnswer | QuestionType::Essay => {
            let mut msg = format!(
                "Similarity {:.2} with the reference answer.",
                scored.raw_similarity
            );
            if scored.adjusted_similarity > scored.raw_similarity {
                msg.push_str(&format!(
                    " Partial credit raised to {:.2}.",
                    scored.adjusted_similarity
                ));
            }
            msg
        }
    }
}

/// Grade all questions for one student.
///
/// Pure and deterministic: identical inputs yield identical outcomes.
/// Unanswered questions are scored against an empty answer.
pub fn grade(
    questions: &[Question],
    answers: &StudentAnswers,
    student_id: &str,
    exam_id: &str,
) -> GradingOutcome {
    let mut per_question_score = BTreeMap::new();
    let mut feedback = BTreeMap::new();

    for question in questions {
        let answer = answers.answer_for(&question.id);
        let scored = score_question(question, answer);
        per_question_score.insert(question.id.clone(), scored.score);
        feedback.insert(question.id.clone(), feedback_for(question, answer, &scored));
    }

    let total_score = per_question_score.values().sum();
    tracing::debug!(student_id, exam_id, total_score, "deterministic grading complete");

    GradingOutcome {
        student_id: student_id.to_string(),
        exam_id: exam_id.to_string(),
        per_question_score,
        total_score,
        feedback,
        method: GradingMethod::Deterministic,
    }
}
