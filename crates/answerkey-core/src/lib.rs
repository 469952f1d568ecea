//! answerkey-core: answer grading engine.
//!
//! Scores exam answers two ways: a deterministic similarity scorer that
//! always succeeds, and an AI-assisted tier that delegates to a hosted model
//! and falls back to the deterministic scorer whenever the model call fails.

pub mod ai;
pub mod answers;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod scorer;
pub mod similarity;
pub mod statistics;
pub mod traits;

pub use ai::{AiGrader, AiGraderConfig};
pub use error::{AiGradingError, GradingError, ProviderError};
pub use model::{GradingMethod, GradingOutcome, Question, QuestionType, StudentAnswers, Submission};
