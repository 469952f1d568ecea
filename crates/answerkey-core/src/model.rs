//! Core data model types for answerkey.
//!
//! Questions come from a question bank, student answers from an OCR or
//! document-extraction pipeline, and a `GradingOutcome` is what the engine
//! hands back for a single (student, exam) pair.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GradingError;

/// The kind of answer a question expects.
///
/// Each variant has its own scoring rule in [`crate::scorer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Choice,
    ShortAnswer,
    LongAnswer,
    Essay,
}

impl QuestionType {
    /// Wire name used in grading prompts and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Choice => "CHOICE",
            QuestionType::ShortAnswer => "SHORT_ANSWER",
            QuestionType::LongAnswer => "LONG_ANSWER",
            QuestionType::Essay => "ESSAY",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = GradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "choice" | "multiple_choice" | "mcq" => Ok(QuestionType::Choice),
            "short_answer" | "short" => Ok(QuestionType::ShortAnswer),
            "long_answer" | "long" => Ok(QuestionType::LongAnswer),
            "essay" => Ok(QuestionType::Essay),
            _ => Err(GradingError::UnknownQuestionType(s.to_string())),
        }
    }
}

/// A single exam question with its answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the exam.
    pub id: String,
    /// The prompt shown to the student.
    pub text: String,
    /// How the answer is scored.
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Answer options, only meaningful for choice questions.
    #[serde(default)]
    pub options: Vec<String>,
    /// The canonical or ideal answer.
    pub reference_answer: String,
    /// Maximum obtainable points.
    pub weight: f64,
    /// Optional explanation of the reference answer.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Answers submitted by one student, keyed by question id.
///
/// Missing keys are treated as an empty answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentAnswers(BTreeMap<String, String>);

impl StudentAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer, replacing any previous answer for the same question.
    pub fn insert(&mut self, question_id: impl Into<String>, answer: impl Into<String>) {
        self.0.insert(question_id.into(), answer.into());
    }

    /// The submitted answer for `question_id`, or `""` if none was given.
    pub fn answer_for(&self, question_id: &str) -> &str {
        self.0.get(question_id).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.0.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StudentAnswers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One student's answers to grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub student_id: String,
    #[serde(default)]
    pub answers: StudentAnswers,
}

/// Which grading tier produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradingMethod {
    /// Similarity-based local scoring.
    Deterministic,
    /// Scores returned by a hosted model.
    Ai,
}

impl fmt::Display for GradingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingMethod::Deterministic => write!(f, "deterministic"),
            GradingMethod::Ai => write!(f, "ai"),
        }
    }
}

/// The graded result for one student on one exam.
///
/// Every question id of the graded exam has exactly one entry in
/// `per_question_score`, and `total_score` is their sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingOutcome {
    pub student_id: String,
    pub exam_id: String,
    /// Points awarded per question id.
    pub per_question_score: BTreeMap<String, f64>,
    /// Sum of `per_question_score`, not normalized.
    pub total_score: f64,
    /// Optional per-question feedback.
    #[serde(default)]
    pub feedback: BTreeMap<String, String>,
    pub method: GradingMethod,
}

impl GradingOutcome {
    /// Sum of the per-question scores.
    pub fn score_sum(&self) -> f64 {
        self.per_question_score.values().sum()
    }

    /// Reset `total_score` to the sum of the per-question scores.
    pub fn recompute_total(&mut self) {
        self.total_score = self.score_sum();
    }

    /// Score awarded for a question, 0.0 if the question was not graded.
    pub fn score_for(&self, question_id: &str) -> f64 {
        self.per_question_score
            .get(question_id)
            .copied()
            .unwrap_or(0.0)
    }

    /// Highest total obtainable for the given questions.
    pub fn max_score(questions: &[Question]) -> f64 {
        questions.iter().map(|q| q.weight).sum()
    }

    /// Total as a fraction of the obtainable maximum, 0.0 when nothing is obtainable.
    pub fn percentage(&self, questions: &[Question]) -> f64 {
        let max = Self::max_score(questions);
        if max <= 0.0 {
            0.0
        } else {
            self.total_score / max
        }
    }
}
