//! answerkey CLI: grade exam submissions from the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "answerkey",
    version,
    about = "Grade exam answers against an answer key"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade submissions against a question bank
    Grade {
        /// Path to the question bank .toml
        #[arg(long)]
        questions: PathBuf,

        /// Submissions .toml with one [[submissions]] table per student
        #[arg(long, required_unless_present = "text", conflicts_with = "text")]
        answers: Option<PathBuf>,

        /// Recognized answer text, one line per question in order
        #[arg(long, requires = "student")]
        text: Option<PathBuf>,

        /// Student id for --text
        #[arg(long, requires = "text")]
        student: Option<String>,

        /// Skip the AI tier and grade deterministically
        #[arg(long)]
        offline: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory (overrides the config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Compare two grading reports of the same exam
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Minimum change in a student's total, in points
        #[arg(long, default_value = "0.5")]
        threshold: f64,

        /// Exit code 1 if any total decreased
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate a question bank
    Validate {
        /// Path to the question bank .toml
        #[arg(long)]
        questions: PathBuf,
    },

    /// Create a starter config and example exam
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("answerkey=info,answerkey_core=info,answerkey_providers=info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            questions,
            answers,
            text,
            student,
            offline,
            config,
            output,
            format,
        } => {
            let source = match (answers, text, student) {
                (Some(path), _, _) => commands::grade::AnswerSource::Submissions(path),
                (None, Some(path), Some(student_id)) => {
                    commands::grade::AnswerSource::RecognizedText { path, student_id }
                }
                _ => {
                    eprintln!("Error: either --answers or --text with --student is required");
                    process::exit(2);
                }
            };
            commands::grade::execute(questions, source, offline, config, output, format).await
        }
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_regression, format),
        Commands::Validate { questions } => commands::validate::execute(questions),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
