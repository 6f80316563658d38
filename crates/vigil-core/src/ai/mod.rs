//! Pluggable text-generation backend abstraction
//!
//! The explanation generator talks to one of these backends to turn a
//! flagged transaction into a short natural-language explanation.
//!
//! # Architecture
//!
//! - `AIBackend` trait: the interface every backend implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `AnthropicBackend`,
//!   `GeminiBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (ollama, anthropic, gemini, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)
//! - `ANTHROPIC_API_KEY`: API key (required for anthropic backend)
//! - `ANTHROPIC_MODEL`, `ANTHROPIC_BASE_URL`: optional overrides
//! - `GEMINI_API_KEY`: API key (required for gemini backend)
//! - `GEMINI_MODEL`, `GEMINI_BASE_URL`: optional overrides

mod anthropic;
mod gemini;
mod mock;
mod ollama;
pub mod parsing;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use mock::MockBackend;
pub use ollama::OllamaBackend;

use async_trait::async_trait;

use crate::error::Result;
use crate::prompts::RenderedPrompt;

/// Upper bound on generated tokens; explanations are one or two sentences
pub(crate) const MAX_OUTPUT_TOKENS: u32 = 256;

/// Trait defining the interface for all text-generation backends
///
/// Backends are Send + Sync so a single client can be shared across tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Generate text for a prompt. Returns the cleaned response text.
    async fn generate(&self, prompt: &RenderedPrompt) -> Result<String>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Local Ollama server
    Ollama(OllamaBackend),
    /// Anthropic Messages API
    Anthropic(AnthropicBackend),
    /// Google Gemini generateContent API
    Gemini(GeminiBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Returns None if the selected backend's required variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "anthropic" | "claude" => AnthropicBackend::from_env().map(AIClient::Anthropic),
            "gemini" | "google" => GeminiBackend::from_env().map(AIClient::Gemini),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Short backend name for display
    pub fn kind(&self) -> &'static str {
        match self {
            AIClient::Ollama(_) => "ollama",
            AIClient::Anthropic(_) => "anthropic",
            AIClient::Gemini(_) => "gemini",
            AIClient::Mock(_) => "mock",
        }
    }
}

impl From<MockBackend> for AIClient {
    fn from(backend: MockBackend) -> Self {
        AIClient::Mock(backend)
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn generate(&self, prompt: &RenderedPrompt) -> Result<String> {
        match self {
            AIClient::Ollama(b) => b.generate(prompt).await,
            AIClient::Anthropic(b) => b.generate(prompt).await,
            AIClient::Gemini(b) => b.generate(prompt).await,
            AIClient::Mock(b) => b.generate(prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Anthropic(b) => b.health_check().await,
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::Anthropic(b) => b.model(),
            AIClient::Gemini(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::Anthropic(b) => b.host(),
            AIClient::Gemini(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
