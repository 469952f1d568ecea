//! Aggregate statistics across the graded students of one exam.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{GradingMethod, GradingOutcome, Question};

/// Summary of a batch of outcomes for one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSummary {
    /// Number of graded students.
    pub students: usize,
    /// Mean total score.
    pub mean_total: f64,
    /// Lowest total score (0.0 when no students).
    pub min_total: f64,
    /// Highest total score (0.0 when no students).
    pub max_total: f64,
    /// Highest obtainable total.
    pub max_possible: f64,
    /// Mean score per question id.
    pub per_question_mean: BTreeMap<String, f64>,
    /// Outcomes produced by the AI tier.
    pub ai_graded: usize,
    /// Outcomes produced by the deterministic tier.
    pub deterministic_graded: usize,
}

impl ExamSummary {
    /// Mean total as a fraction of the obtainable maximum.
    pub fn mean_percentage(&self) -> f64 {
        if self.max_possible <= 0.0 {
            0.0
        } else {
            self.mean_total / self.max_possible
        }
    }
}

/// Compute summary statistics for `outcomes` graded against `questions`.
pub fn summarize(outcomes: &[GradingOutcome], questions: &[Question]) -> ExamSummary {
    let students = outcomes.len();
    let n = students.max(1) as f64;

    let totals = outcomes.iter().map(|o| o.total_score);
    let mean_total = totals.clone().sum::<f64>() / n;
    let min_total = totals.clone().reduce(f64::min).unwrap_or(0.0);
    let max_total = totals.reduce(f64::max).unwrap_or(0.0);

    let per_question_mean = questions
        .iter()
        .map(|q| {
            let sum: f64 = outcomes.iter().map(|o| o.score_for(&q.id)).sum();
            (q.id.clone(), sum / n)
        })
        .collect();

    let ai_graded = outcomes
        .iter()
        .filter(|o| o.method == GradingMethod::Ai)
        .count();

    ExamSummary {
        students,
        mean_total,
        min_total,
        max_total,
        max_possible: GradingOutcome::max_score(questions),
        per_question_mean,
        ai_graded,
        deterministic_graded: students - ai_graded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionType;

    fn question(id: &str, weight: f64) -> Question {
        Question {
            id: id.into(),
            text: String::new(),
            question_type: QuestionType::ShortAnswer,
            options: vec![],
            reference_answer: String::new(),
            weight,
            explanation: None,
        }
    }

    fn outcome(student: &str, scores: &[(&str, f64)], method: GradingMethod) -> GradingOutcome {
        let per_question_score: BTreeMap<String, f64> =
            scores.iter().map(|(id, s)| (id.to_string(), *s)).collect();
        let total_score = per_question_score.values().sum();
        GradingOutcome {
            student_id: student.into(),
            exam_id: "e".into(),
            per_question_score,
            total_score,
            feedback: BTreeMap::new(),
            method,
        }
    }

    #[test]
    fn summary_over_students() {
        let questions = vec![question("q1", 10.0), question("q2", 30.0)];
        let outcomes = vec![
            outcome("a", &[("q1", 10.0), ("q2", 20.0)], GradingMethod::Ai),
            outcome("b", &[("q1", 0.0), ("q2", 10.0)], GradingMethod::Deterministic),
        ];

        let summary = summarize(&outcomes, &questions);
        assert_eq!(summary.students, 2);
        assert_eq!(summary.mean_total, 20.0);
        assert_eq!(summary.min_total, 10.0);
        assert_eq!(summary.max_total, 30.0);
        assert_eq!(summary.max_possible, 40.0);
        assert_eq!(summary.per_question_mean["q1"], 5.0);
        assert_eq!(summary.per_question_mean["q2"], 15.0);
        assert_eq!(summary.ai_graded, 1);
        assert_eq!(summary.deterministic_graded, 1);
        assert_eq!(summary.mean_percentage(), 0.5);
    }

    #[test]
    fn empty_batch() {
        let summary = summarize(&[], &[question("q1", 10.0)]);
        assert_eq!(summary.students, 0);
        assert_eq!(summary.mean_total, 0.0);
        assert_eq!(summary.min_total, 0.0);
        assert_eq!(summary.per_question_mean["q1"], 0.0);
    }
}
