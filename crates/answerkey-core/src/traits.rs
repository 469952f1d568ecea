//! The hosted-model seam used by the AI grading adapter.
//!
//! Implemented by the clients in `answerkey-providers`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A hosted generative model that can answer a single prompt.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Whether an access credential is present.
    ///
    /// The grading adapter checks this before any network call.
    fn is_configured(&self) -> bool;

    /// Send a prompt and return the raw text of the reply.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError>;
}

/// Request sent to a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gpt-4.1-mini").
    pub model: String,
    /// The user prompt.
    pub prompt: String,
    /// Optional system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Reply from a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response text.
    pub content: String,
    /// Model that actually answered.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Strip Markdown code fences surrounding a model reply.
///
/// Prefers the first ```json block, then the first bare ``` block, and
/// otherwise returns the trimmed input. An unclosed fence (truncated reply)
/// still yields its accumulated content.
pub fn strip_code_fences(response: &str) -> String {
    let mut json_block: Option<String> = None;
    let mut generic_block: Option<String> = None;
    let mut in_block = false;
    let mut is_json = false;
    let mut current = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            if let Some((lang_is_json, body)) = inline_fence(trimmed) {
                if lang_is_json {
                    json_block.get_or_insert(body);
                } else {
                    generic_block.get_or_insert(body);
                }
                continue;
            }
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json = lang == "json" || lang == "jsonc";
            current.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            let block = std::mem::take(&mut current);
            if is_json {
                json_block.get_or_insert(block);
            } else {
                generic_block.get_or_insert(block);
            }
            continue;
        }

        if in_block {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if in_block && !current.is_empty() {
        if is_json {
            json_block.get_or_insert(current);
        } else {
            generic_block.get_or_insert(current);
        }
    }

    json_block
        .or(generic_block)
        .map(|block| block.trim().to_string())
        .unwrap_or_else(|| response.trim().to_string())
}

/// A fence opened and closed on one line, e.g. ```` ```json {"a": 1}``` ````.
///
/// Returns whether the block is tagged as JSON, and its body.
fn inline_fence(line: &str) -> Option<(bool, String)> {
    let inner = line.strip_prefix("```")?.strip_suffix("```")?;
    let inner = inner.trim_start_matches('`').trim();
    if inner.is_empty() {
        return None;
    }

    let lang_len = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    let (lang, rest) = inner.split_at(lang_len);
    let lang = lang.to_lowercase();
    if (lang == "json" || lang == "jsonc") && !rest.trim().is_empty() {
        Some((true, rest.trim().to_string()))
    } else {
        Some((false, inner.to_string()))
    }
}
