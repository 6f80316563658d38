//! Vigil Core Library
//!
//! Transaction anomaly detection for personal finance data:
//! - Database access and migrations
//! - CSV import for transaction exports
//! - Window statistics and z-score anomaly scoring
//! - Natural-language explanations via pluggable AI backends
//! - Prompt library for customizable AI prompts

pub mod ai;
pub mod config;
pub mod db;
pub mod detect;
pub mod error;
pub mod explain;
pub mod import;
pub mod models;
pub mod prompts;
pub mod score;
pub mod stats;
pub mod store;

/// Test utilities including a mock LLM server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, AnthropicBackend, GeminiBackend, MockBackend, OllamaBackend};
pub use config::DetectionConfig;
pub use db::Database;
pub use detect::AnomalyDetector;
pub use error::{Error, Result};
pub use explain::{fallback_explanation, AiExplainer, ExplanationGenerator};
pub use import::{ImportOptions, ImportSummary};
pub use models::{AnomalyCandidate, AnomalyData, AnomalyReason, Transaction, User};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary, RenderedPrompt};
pub use score::{AnomalyScorer, ZScoreScorer};
pub use stats::{StatisticsCalculator, TransactionStatistics, WindowStatistics};
pub use store::TransactionStore;
