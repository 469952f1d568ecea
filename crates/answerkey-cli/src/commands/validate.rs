//! The `answerkey validate` command.

use std::path::PathBuf;

use anyhow::Result;

use answerkey_core::model::GradingOutcome;
use answerkey_core::parser;

pub fn execute(questions_path: PathBuf) -> Result<()> {
    let bank = parser::parse_question_bank(&questions_path)?;

    println!(
        "Exam: {} ({} questions, max score {:.2})",
        bank.name,
        bank.questions.len(),
        GradingOutcome::max_score(&bank.questions)
    );

    let warnings = parser::validate_question_bank(&bank);
    for w in &warnings {
        let prefix = w
            .question_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Question bank valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
