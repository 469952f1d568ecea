//! Mock provider for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use answerkey_core::traits::{GenerateRequest, GenerateResponse, LlmProvider};

use crate::error::ProviderError;

/// A failure the mock should report instead of replying.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Network,
    Timeout,
    Status(u16),
}

impl MockFailure {
    fn to_error(&self) -> ProviderError {
        match self {
            MockFailure::Network => ProviderError::NetworkError("connection refused".into()),
            MockFailure::Timeout => ProviderError::Timeout(120),
            MockFailure::Status(401) => ProviderError::AuthenticationFailed("mock".into()),
            MockFailure::Status(status) => ProviderError::ApiError {
                status: *status,
                message: "mock failure".into(),
            },
        }
    }
}

/// A mock model provider for exercising the grading adapter without API calls.
///
/// Replies are chosen by prompt substring, falling back to a default.
pub struct MockProvider {
    /// Map of prompt substring → reply.
    responses: HashMap<String, String>,
    /// Reply if no substring matches.
    default_response: String,
    /// Report this failure on every call instead of replying.
    failure: Option<MockFailure>,
    /// Whether the mock pretends to hold a credential.
    configured: bool,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    /// Create a mock with the given prompt→reply mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: "{}".to_string(),
            failure: None,
            configured: true,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same reply.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock whose every call fails.
    pub fn failing(failure: MockFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock without a credential.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(HashMap::new())
        }
    }

    /// Number of `generate` calls made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if let Some(failure) = &self.failure {
            return Err(failure.to_error());
        }

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            latency_ms: 1,
        })
    }
}
