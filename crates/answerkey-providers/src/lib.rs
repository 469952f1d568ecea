//! answerkey-providers: hosted model clients for AI grading.
//!
//! Implements the `LlmProvider` trait for OpenAI and Anthropic, plus a mock
//! for tests, and loads the answerkey configuration file.

pub mod anthropic;
pub mod config;
pub mod error;
pub mod mock;
pub mod openai;

pub use config::{create_provider, load_config, load_config_from, AnswerkeyConfig, ProviderConfig};
pub use error::ProviderError;
