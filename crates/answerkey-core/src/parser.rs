//! TOML question bank and submission parser.
//!
//! Loads question banks and student submissions from TOML files and
//! validates question banks for common authoring mistakes.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::GradingError;
use crate::model::{Question, QuestionType, StudentAnswers, Submission};

/// A parsed exam: header plus ordered questions.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    pub exam_id: String,
    pub name: String,
    pub description: String,
    pub questions: Vec<Question>,
}

/// Intermediate TOML structure for question bank files.
#[derive(Debug, Deserialize)]
struct TomlQuestionBank {
    exam: TomlExamHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    text: String,
    #[serde(rename = "type")]
    question_type: String,
    #[serde(default)]
    options: Vec<String>,
    reference_answer: String,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    explanation: Option<String>,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct TomlSubmissions {
    #[serde(default)]
    submissions: Vec<Submission>,
}

/// Parse a question bank file.
pub fn parse_question_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_question_bank_str(&content, path)
}

/// Parse a question bank from a TOML string.
///
/// Unknown question types, negative or non-finite weights and duplicate
/// question ids are errors.
pub fn parse_question_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlQuestionBank = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut seen_ids = HashSet::new();
    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let question_type: QuestionType = q
                .question_type
                .parse()
                .with_context(|| format!("question '{}' in {}", q.id, source_path.display()))?;

            if !q.weight.is_finite() || q.weight < 0.0 {
                return Err(GradingError::InvalidWeight {
                    question_id: q.id,
                    weight: q.weight,
                }
                .into());
            }

            if !seen_ids.insert(q.id.clone()) {
                return Err(GradingError::DuplicateQuestionId(q.id).into());
            }

            Ok(Question {
                id: q.id,
                text: q.text,
                question_type,
                options: q.options,
                reference_answer: q.reference_answer,
                weight: q.weight,
                explanation: q.explanation,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuestionBank {
        exam_id: parsed.exam.id,
        name: parsed.exam.name,
        description: parsed.exam.description,
        questions,
    })
}

/// Parse a submissions file.
pub fn parse_submissions(path: &Path) -> Result<Vec<Submission>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read submissions: {}", path.display()))?;

    parse_submissions_str(&content, path)
}

/// Parse submissions from a TOML string of `[[submissions]]` tables.
pub fn parse_submissions_str(content: &str, source_path: &Path) -> Result<Vec<Submission>> {
    let parsed: TomlSubmissions = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut seen = HashSet::new();
    for submission in &parsed.submissions {
        if !seen.insert(submission.student_id.as_str()) {
            anyhow::bail!(
                "duplicate student_id '{}' in {}",
                submission.student_id,
                source_path.display()
            );
        }
    }

    Ok(parsed.submissions)
}

/// Build a single submission from already-split answers.
pub fn submission(student_id: impl Into<String>, answers: StudentAnswers) -> Submission {
    Submission {
        student_id: student_id.into(),
        answers,
    }
}

/// A warning from question bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a question bank for common issues.
pub fn validate_question_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "exam has no questions".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for q in &bank.questions {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message,
            })
        };

        if !seen_ids.insert(&q.id) {
            warn(format!("duplicate question ID: {}", q.id));
        }
        if q.reference_answer.trim().is_empty() {
            warn("reference answer is empty".into());
        }
        if q.weight == 0.0 {
            warn("weight is zero, question cannot earn points".into());
        }
        if q.question_type == QuestionType::Choice {
            if q.options.is_empty() {
                warn("choice question has no options".into());
            } else if !q
                .options
                .iter()
                .any(|o| crate::scorer::choice_matches(o, &q.reference_answer))
            {
                warn(format!(
                    "reference answer '{}' is not one of the options",
                    q.reference_answer
                ));
            }
        } else if !q.options.is_empty() {
            warn(format!(
                "options are ignored for {} questions",
                q.question_type
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[exam]
id = "geo-101"
name = "Geography Basics"
description = "Capitals and climate"

[[questions]]
id = "q1"
text = "What is the capital of Indonesia?"
type = "choice"
options = ["Jakarta", "Bandung", "Surabaya"]
reference_answer = "Jakarta"
weight = 10

[[questions]]
id = "q2"
text = "Describe the water cycle."
type = "essay"
reference_answer = """
Water evaporates, condenses into clouds and falls back as precipitation.
"""
weight = 30
explanation = "Evaporation, condensation, precipitation."
"#;

    #[test]
    fn parse_valid_toml() {
        let bank = parse_question_bank_str(VALID_TOML, &PathBuf::from("geo.toml")).unwrap();
        assert_eq!(bank.exam_id, "geo-101");
        assert_eq!(bank.name, "Geography Basics");
        assert_eq!(bank.questions.len(), 2);
        assert_eq!(bank.questions[0].question_type, QuestionType::Choice);
        assert_eq!(bank.questions[0].options.len(), 3);
        assert_eq!(bank.questions[1].question_type, QuestionType::Essay);
        assert_eq!(bank.questions[1].weight, 30.0);
        assert!(bank.questions[1].explanation.is_some());
        assert!(validate_question_bank(&bank).is_empty());
    }

    #[test]
    fn missing_weight_defaults_to_one() {
        let toml = r#"
[exam]
id = "minimal"
name = "Minimal"

[[questions]]
id = "q1"
text = "Name a primary colour."
type = "short_answer"
reference_answer = "red"
"#;
        let bank = parse_question_bank_str(toml, &PathBuf::from("m.toml")).unwrap();
        assert_eq!(bank.questions[0].weight, 1.0);
        assert!(bank.description.is_empty());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let toml = r#"
[exam]
id = "bad"
name = "Bad"

[[questions]]
id = "q1"
text = "True or false?"
type = "true_false"
reference_answer = "true"
"#;
        let err = parse_question_bank_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        let grading = err.downcast_ref::<GradingError>();
        assert!(matches!(
            grading,
            Some(GradingError::UnknownQuestionType(t)) if t == "true_false"
        ));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let toml = r#"
[exam]
id = "bad"
name = "Bad"

[[questions]]
id = "q1"
text = "?"
type = "essay"
reference_answer = "x"
weight = -5
"#;
        let err = parse_question_bank_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("invalid weight"));
    }

    #[test]
    fn duplicate_question_ids_are_rejected() {
        let toml = r#"
[exam]
id = "dupes"
name = "Dupes"

[[questions]]
id = "q1"
text = "Capital of Indonesia?"
type = "choice"
options = ["Jakarta", "Bandung"]
reference_answer = "Jakarta"
weight = 10

[[questions]]
id = "q1"
text = "Discuss rivers."
type = "essay"
reference_answer = "Rivers erode and deposit sediment."
weight = 30
"#;
        let err = parse_question_bank_str(toml, &PathBuf::from("d.toml")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GradingError>(),
            Some(&GradingError::DuplicateQuestionId("q1".into()))
        );
    }

    #[test]
    fn validate_duplicate_ids_and_bad_choice() {
        let toml = r#"
[exam]
id = "choices"
name = "Choices"

[[questions]]
id = "first"
text = "Pick one"
type = "choice"
options = ["A", "B"]
reference_answer = "C"

[[questions]]
id = "second"
text = "Pick another"
type = "choice"
reference_answer = "A"
"#;
        let mut bank = parse_question_bank_str(toml, &PathBuf::from("d.toml")).unwrap();
        let copy = bank.questions[0].clone();
        bank.questions.push(copy);
        let warnings = validate_question_bank(&bank);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("not one of the options")));
        assert!(warnings.iter().any(|w| w.message.contains("no options")));
    }

    #[test]
    fn parse_malformed_toml() {
        let result = parse_question_bank_str("this is not [valid toml }{", &PathBuf::from("x.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn parse_submissions_file() {
        let toml = r#"
[[submissions]]
student_id = "s-001"
[submissions.answers]
q1 = "jakarta"
q2 = "Water evaporates and then it rains."

[[submissions]]
student_id = "s-002"
"#;
        let subs = parse_submissions_str(toml, &PathBuf::from("subs.toml")).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].answers.answer_for("q1"), "jakarta");
        assert!(subs[1].answers.is_empty());
    }

    #[test]
    fn duplicate_students_are_rejected() {
        let toml = r#"
[[submissions]]
student_id = "s-001"

[[submissions]]
student_id = "s-001"
"#;
        assert!(parse_submissions_str(toml, &PathBuf::from("subs.toml")).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geo.toml");
        std::fs::write(&path, VALID_TOML).unwrap();

        let bank = parse_question_bank(&path).unwrap();
        assert_eq!(bank.exam_id, "geo-101");
    }
}
