//! The `answerkey grade` command.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use answerkey_core::ai::AiGrader;
use answerkey_core::answers::map_lines_to_questions;
use answerkey_core::model::{GradingOutcome, Question, Submission};
use answerkey_core::parser::{self, QuestionBank};
use answerkey_core::report::{ExamHeader, GradingReport};
use answerkey_core::scorer;
use answerkey_providers::config::{load_config_from, AnswerkeyConfig};
use answerkey_providers::create_provider;

/// Where the students' answers come from.
pub enum AnswerSource {
    /// A TOML file of `[[submissions]]`.
    Submissions(PathBuf),
    /// Recognized text for a single student, one answer per line.
    RecognizedText { path: PathBuf, student_id: String },
}

pub async fn execute(
    questions_path: PathBuf,
    source: AnswerSource,
    offline: bool,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    format: String,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "table" | "json"),
        "unknown format '{format}', expected 'table' or 'json'"
    );

    let config = load_config_from(config_path.as_deref())?;
    let bank = parser::parse_question_bank(&questions_path)?;
    let submissions = load_submissions(&bank, source)?;

    eprintln!(
        "answerkey v{}: grading {} submission(s) x {} question(s) for '{}'",
        env!("CARGO_PKG_VERSION"),
        submissions.len(),
        bank.questions.len(),
        bank.name
    );

    let start = Instant::now();
    let (provider, outcomes) = grade_all(&config, &bank, &submissions, offline).await?;
    let duration_ms = start.elapsed().as_millis() as u64;

    let report = GradingReport::new(
        ExamHeader::from_bank(&bank),
        &bank.questions,
        provider,
        outcomes,
        duration_ms,
    );

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_table(&report, &bank.questions),
    }

    let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
    let path = save_report(&report, &output_dir)?;
    eprintln!("Results saved to: {}", path.display());

    Ok(())
}

fn load_submissions(bank: &QuestionBank, source: AnswerSource) -> Result<Vec<Submission>> {
    match source {
        AnswerSource::Submissions(path) => parser::parse_submissions(&path),
        AnswerSource::RecognizedText { path, student_id } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read recognized text: {}", path.display()))?;
            let answers = map_lines_to_questions(&text, &bank.questions);
            Ok(vec![parser::submission(student_id, answers)])
        }
    }
}

/// Grade every submission, returning the AI provider name when one was used.
async fn grade_all(
    config: &AnswerkeyConfig,
    bank: &QuestionBank,
    submissions: &[Submission],
    offline: bool,
) -> Result<(Option<String>, Vec<GradingOutcome>)> {
    let provider_config = if offline {
        tracing::info!("offline mode, grading deterministically");
        None
    } else {
        let found = config.default_provider_config();
        if found.is_none() {
            tracing::info!(
                provider = %config.default_provider,
                "provider not configured, grading deterministically"
            );
        }
        found
    };

    let Some(provider_config) = provider_config else {
        let outcomes = submissions
            .iter()
            .map(|s| scorer::grade(&bank.questions, &s.answers, &s.student_id, &bank.exam_id))
            .collect();
        return Ok((None, outcomes));
    };

    let provider = create_provider(provider_config)?;
    // A provider without a key grades every student deterministically.
    let provider_name = provider
        .is_configured()
        .then(|| provider.name().to_string());
    let grader = AiGrader::new(provider, config.grader_config());
    let outcomes = grader
        .grade_batch(&bank.questions, submissions, &bank.exam_id, config.parallelism)
        .await;
    Ok((provider_name, outcomes))
}

fn print_table(report: &GradingReport, questions: &[Question]) {
    let mut table = Table::new();
    let mut header = vec!["Student".to_string()];
    header.extend(questions.iter().map(|q| q.id.clone()));
    header.extend(["Total".to_string(), "%".to_string(), "Method".to_string()]);
    table.set_header(header);

    for outcome in &report.outcomes {
        let mut row = vec![Cell::new(&outcome.student_id)];
        row.extend(
            questions
                .iter()
                .map(|q| Cell::new(format!("{:.2}", outcome.score_for(&q.id)))),
        );
        row.push(Cell::new(format!(
            "{:.2} / {:.2}",
            outcome.total_score, report.exam.max_score
        )));
        row.push(Cell::new(format!(
            "{:.1}%",
            outcome.percentage(questions) * 100.0
        )));
        row.push(Cell::new(outcome.method));
        table.add_row(row);
    }

    println!("{table}");

    let summary = &report.summary;
    println!(
        "Mean: {:.2} ({:.1}%)  Min: {:.2}  Max: {:.2}  AI: {}  Deterministic: {}",
        summary.mean_total,
        summary.mean_percentage() * 100.0,
        summary.min_total,
        summary.max_total,
        summary.ai_graded,
        summary.deterministic_graded
    );
}

fn save_report(report: &GradingReport, output_dir: &Path) -> Result<PathBuf> {
    let timestamp = report.created_at.format("%Y-%m-%dT%H%M%S");
    let path = output_dir.join(format!("{}-{timestamp}.json", report.exam.id));
    report.save_json(&path)?;
    Ok(path)
}
