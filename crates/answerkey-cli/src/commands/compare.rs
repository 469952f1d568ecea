//! The `answerkey compare` command.

use std::path::PathBuf;

use anyhow::Result;

use answerkey_core::report::{GradingReport, ScoreChange};

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_regression: bool,
    format: String,
) -> Result<()> {
    anyhow::ensure!(threshold >= 0.0, "threshold must not be negative");

    let baseline = GradingReport::load_json(&baseline_path)?;
    let current = GradingReport::load_json(&current_path)?;

    let report = current.compare(&baseline, threshold);
    if report.exam_mismatch {
        tracing::warn!(
            baseline = %baseline.exam.id,
            current = %current.exam.id,
            "comparing reports of different exams"
        );
    }

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "Comparison: {} decreased, {} increased, {} unchanged",
                report.decreases.len(),
                report.increases.len(),
                report.unchanged
            );
            print_changes("Decreases", &report.decreases);
            print_changes("Increases", &report.increases);

            if report.new_students > 0 {
                println!("\n{} new student(s)", report.new_students);
            }
            if report.removed_students > 0 {
                println!("{} removed student(s)", report.removed_students);
            }
        }
    }

    if fail_on_regression && report.has_decreases() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_changes(title: &str, changes: &[ScoreChange]) {
    if changes.is_empty() {
        return;
    }
    println!("\n{title}:");
    for c in changes {
        println!(
            "  {} {:.2} -> {:.2} ({:+.2})",
            c.student_id, c.baseline_total, c.current_total, c.delta
        );
    }
}
