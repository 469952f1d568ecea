//! The `answerkey init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("answerkey.toml").exists() {
        println!("answerkey.toml already exists, skipping.");
    } else {
        std::fs::write("answerkey.toml", SAMPLE_CONFIG)?;
        println!("Created answerkey.toml");
    }

    std::fs::create_dir_all("exams")?;
    for (path, content) in [
        ("exams/example.toml", EXAMPLE_EXAM),
        ("exams/example-submissions.toml", EXAMPLE_SUBMISSIONS),
    ] {
        if Path::new(path).exists() {
            println!("{path} already exists, skipping.");
        } else {
            std::fs::write(path, content)?;
            println!("Created {path}");
        }
    }

    println!("\nNext steps:");
    println!("  1. Set ANSWERKEY_OPENAI_KEY (or edit answerkey.toml) to enable AI grading");
    println!("  2. Run: answerkey validate --questions exams/example.toml");
    println!(
        "  3. Run: answerkey grade --questions exams/example.toml --answers exams/example-submissions.toml"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# answerkey configuration
# Without an API key every answer is graded deterministically.

default_provider = "openai"
default_model = "gpt-4.1-mini"
temperature = 0.0
max_tokens = 2048
parallelism = 4
output_dir = "./answerkey-results"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"
"#;

const EXAMPLE_EXAM: &str = r#"[exam]
id = "example"
name = "Example Exam"
description = "One question of each type"

[[questions]]
id = "q1"
text = "Which planet is closest to the sun?"
type = "CHOICE"
options = ["Mercury", "Venus", "Mars"]
reference_answer = "Mercury"
weight = 10.0

[[questions]]
id = "q2"
text = "What gas do plants absorb from the air?"
type = "SHORT_ANSWER"
reference_answer = "carbon dioxide"
weight = 10.0

[[questions]]
id = "q3"
text = "Explain how a rainbow forms."
type = "LONG_ANSWER"
reference_answer = "Sunlight is refracted, reflected and dispersed inside raindrops, splitting it into its colors."
weight = 20.0

[[questions]]
id = "q4"
text = "Discuss why biodiversity matters."
type = "ESSAY"
reference_answer = "Biodiversity keeps ecosystems stable and productive and provides food, medicine and clean water."
weight = 30.0
"#;

const EXAMPLE_SUBMISSIONS: &str = r#"[[submissions]]
student_id = "student-1"

[submissions.answers]
q1 = "mercury"
q2 = "carbon dioxide"
q3 = "Light is refracted and reflected in raindrops and split into colors."
q4 = "Biodiversity keeps ecosystems stable."
"#;
