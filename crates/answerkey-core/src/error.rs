//! Error types for grading and model-provider calls.
//!
//! `ProviderError` is defined here rather than in `answerkey-providers` so
//! the AI grading adapter can classify transport failures without depending
//! on a concrete client.

use thiserror::Error;

/// Errors that can occur when interacting with a hosted model.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Errors in question-bank data that grading cannot absorb.
///
/// These indicate corrupted or misconfigured exam data and are reported
/// separately from AI-path failures.
#[derive(Debug, Error, PartialEq)]
pub enum GradingError {
    /// A question carries a type the engine has no scoring rule for.
    #[error("unknown question type: {0}")]
    UnknownQuestionType(String),

    /// A question weight is negative or not a finite number.
    #[error("invalid weight {weight} for question {question_id}")]
    InvalidWeight { question_id: String, weight: f64 },

    /// Two questions in one exam share an id.
    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(String),
}

/// Reasons the AI grading tier could not produce an outcome.
///
/// Every variant is recovered locally by falling back to the deterministic
/// scorer; none of them reach the caller of [`crate::ai::AiGrader::grade`].
#[derive(Debug, Error)]
pub enum AiGradingError {
    /// No access credential is configured for the provider.
    #[error("no API credential configured for provider '{0}'")]
    MissingCredential(String),

    /// The remote call failed (network, timeout, HTTP error).
    #[error("transport error: {0}")]
    Transport(#[from] ProviderError),

    /// The response body was not valid JSON.
    #[error("malformed JSON in grading response: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The response was JSON but not the expected grading object.
    #[error("unexpected grading response shape: {0}")]
    Schema(String),
}

impl AiGradingError {
    /// Short label used in logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            AiGradingError::MissingCredential(_) => "configuration",
            AiGradingError::Transport(_) => "transport",
            AiGradingError::MalformedJson(_) | AiGradingError::Schema(_) => "schema",
        }
    }
}
