//! HTTP error classification shared by the hosted-model clients.

use std::time::Duration;

use serde::Deserialize;

pub use answerkey_core::error::ProviderError;

/// Client-side timeout for a single model call.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Fallback wait when a 429 carries no usable `retry-after` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// `{"error": {"message": ...}}`, the error body used by both OpenAI and Anthropic.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub(crate) fn build_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| ProviderError::NetworkError(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
    } else {
        ProviderError::NetworkError(e.to_string())
    }
}

/// Map non-success HTTP statuses to `ProviderError`, passing successes through.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    match status {
        429 => {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            Err(ProviderError::RateLimited {
                retry_after_ms: retry_after_secs * 1000,
            })
        }
        401 | 403 => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::AuthenticationFailed(body))
        }
        404 => Err(ProviderError::ModelNotFound(model.to_string())),
        s if s >= 400 => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            Err(ProviderError::ApiError { status, message })
        }
        _ => Ok(response),
    }
}

/// Decode a success body, reporting undecodable payloads as `ApiError { status: 0 }`.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    response.json().await.map_err(|e| ProviderError::ApiError {
        status: 0,
        message: format!("failed to parse response: {e}"),
    })
}
