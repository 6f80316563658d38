//! Mock backend for testing
//!
//! Returns a fixed explanation, a failure, or a delayed response.
//! Useful for unit tests and development without a running LLM server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::prompts::RenderedPrompt;

use super::parsing::clean_response;
use super::AIBackend;

const DEFAULT_RESPONSE: &str = "This transaction stands out from your recent spending pattern.";

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Text returned by generate; None makes every call fail
    response: Option<String>,
    /// Artificial latency before answering
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy, fixed response)
    pub fn new() -> Self {
        Self {
            healthy: true,
            response: Some(DEFAULT_RESPONSE.to_string()),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock that answers with the given text
    pub fn with_response(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            ..Self::new()
        }
    }

    /// Create a mock whose generate calls always fail
    pub fn failing() -> Self {
        Self {
            healthy: false,
            response: None,
            ..Self::new()
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Delay every response by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of generate calls made (shared across clones)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate(&self, _prompt: &RenderedPrompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.response {
            Some(text) => clean_response(text),
            None => Err(Error::Ai("mock backend configured to fail".into())),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
