//! Batch grading reports with JSON persistence and regrade comparison.
//!
//! Outcomes are never mutated after grading; regrading an exam produces a
//! new report that can be compared against the previous one.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{GradingOutcome, Question};
use crate::parser::QuestionBank;
use crate::statistics::{summarize, ExamSummary};

/// The graded results for every submission of one exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// The exam that was graded.
    pub exam: ExamHeader,
    /// Provider used for the AI tier, if any.
    #[serde(default)]
    pub provider: Option<String>,
    /// One outcome per submission, in submission order.
    pub outcomes: Vec<GradingOutcome>,
    /// Aggregate statistics.
    pub summary: ExamSummary,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Identifying details of a graded exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamHeader {
    pub id: String,
    pub name: String,
    pub question_count: usize,
    pub max_score: f64,
}

impl ExamHeader {
    pub fn from_bank(bank: &QuestionBank) -> Self {
        Self {
            id: bank.exam_id.clone(),
            name: bank.name.clone(),
            question_count: bank.questions.len(),
            max_score: GradingOutcome::max_score(&bank.questions),
        }
    }
}

impl GradingReport {
    /// Assemble a report, computing its summary from `outcomes`.
    pub fn new(
        exam: ExamHeader,
        questions: &[Question],
        provider: Option<String>,
        outcomes: Vec<GradingOutcome>,
        duration_ms: u64,
    ) -> Self {
        let summary = summarize(&outcomes, questions);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            exam,
            provider,
            outcomes,
            summary,
            duration_ms,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: GradingReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Compare this report against an earlier grading of the same exam.
    ///
    /// A student's total moving by more than `threshold` points counts as a
    /// change.
    pub fn compare(&self, baseline: &GradingReport, threshold: f64) -> RegradeReport {
        let totals = |report: &GradingReport| -> HashMap<String, f64> {
            report
                .outcomes
                .iter()
                .map(|o| (o.student_id.clone(), o.total_score))
                .collect()
        };

        let baseline_totals = totals(baseline);
        let current_totals = totals(self);

        let mut decreases = Vec::new();
        let mut increases = Vec::new();
        let mut unchanged = 0usize;
        let mut new_students = 0usize;

        for (student_id, &current) in &current_totals {
            let Some(&previous) = baseline_totals.get(student_id) else {
                new_students += 1;
                continue;
            };
            let delta = current - previous;
            let change = ScoreChange {
                student_id: student_id.clone(),
                baseline_total: previous,
                current_total: current,
                delta,
            };
            if delta < -threshold {
                decreases.push(change);
            } else if delta > threshold {
                increases.push(change);
            } else {
                unchanged += 1;
            }
        }

        let removed_students = baseline_totals
            .keys()
            .filter(|k| !current_totals.contains_key(*k))
            .count();

        decreases.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        increases.sort_by(|a, b| a.student_id.cmp(&b.student_id));

        RegradeReport {
            exam_mismatch: self.exam.id != baseline.exam.id,
            decreases,
            increases,
            unchanged,
            new_students,
            removed_students,
        }
    }
}

/// Result of comparing two gradings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegradeReport {
    /// The two reports grade different exams.
    pub exam_mismatch: bool,
    /// Students whose total went down.
    pub decreases: Vec<ScoreChange>,
    /// Students whose total went up.
    pub increases: Vec<ScoreChange>,
    /// Students with no significant change.
    pub unchanged: usize,
    /// Students only in the current report.
    pub new_students: usize,
    /// Students only in the baseline report.
    pub removed_students: usize,
}

/// A change in one student's total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreChange {
    pub student_id: String,
    pub baseline_total: f64,
    pub current_total: f64,
    pub delta: f64,
}

impl RegradeReport {
    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        if self.exam_mismatch {
            md.push_str("> **Warning:** reports grade different exams.\n\n");
        }

        md.push_str(&format!(
            "**Summary:** {} decreased, {} increased, {} unchanged\n\n",
            self.decreases.len(),
            self.increases.len(),
            self.unchanged
        ));

        for (title, changes) in [("Decreases", &self.decreases), ("Increases", &self.increases)] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Student | Baseline | Current | Delta |\n");
            md.push_str("|---------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {:.2} | {:.2} | {:+.2} |\n",
                    c.student_id, c.baseline_total, c.current_total, c.delta
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Returns true if any student's total went down.
    pub fn has_decreases(&self) -> bool {
        !self.decreases.is_empty()
    }
}
