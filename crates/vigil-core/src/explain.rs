//! Natural-language explanations for flagged transactions
//!
//! One request per candidate to the configured text-generation backend,
//! bounded by a timeout. Any failure (no backend, timeout, transport error,
//! non-2xx, empty text) falls back to a deterministic one-sentence explanation
//! chosen from the candidate's reasons.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::ai::{AIBackend, AIClient};
use crate::error::{Error, Result};
use crate::models::{AnomalyCandidate, AnomalyReason};
use crate::prompts::{PromptId, PromptLibrary, RenderedPrompt};

/// Produces an explanation for a candidate; never fails
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    async fn explain(&self, candidate: &AnomalyCandidate) -> String;
}

/// Explanation generator backed by an AI client with a local fallback
pub struct AiExplainer {
    client: Option<AIClient>,
    prompts: Mutex<PromptLibrary>,
    timeout: Duration,
}

impl AiExplainer {
    /// Create a generator using the default prompt library
    pub fn new(client: Option<AIClient>, timeout: Duration) -> Self {
        Self {
            client,
            prompts: Mutex::new(PromptLibrary::new()),
            timeout,
        }
    }

    /// Generator that always uses the fallback sentences
    pub fn fallback_only() -> Self {
        Self::new(None, Duration::ZERO)
    }

    /// Use a specific prompt library (e.g. embedded-only in tests)
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Mutex::new(prompts);
        self
    }

    /// Render the explanation prompt for a candidate
    pub fn build_prompt(&self, candidate: &AnomalyCandidate) -> Result<RenderedPrompt> {
        let tx = &candidate.transaction;
        let amount = format_amount(tx.amount);
        let date = tx.date.to_string();
        let reasons = candidate.reasons_joined();
        // Raw bank text only adds information when a clean merchant name exists
        let description = match tx.merchant_name.as_deref() {
            Some(m) if !m.trim().is_empty() && m.trim() != tx.description.trim() => {
                tx.description.trim()
            }
            _ => "",
        };

        let mut vars = HashMap::new();
        vars.insert("merchant", tx.display_name());
        vars.insert("amount", amount.as_str());
        vars.insert("category", tx.category_label());
        vars.insert("date", date.as_str());
        vars.insert("reasons", reasons.as_str());
        vars.insert("description", description);

        let mut prompts = self
            .prompts
            .lock()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(PromptId::ExplainAnomaly)?;
        Ok(template.render_parts(&vars))
    }

    /// Ask the backend for an explanation, surfacing every failure
    pub async fn try_explain(&self, candidate: &AnomalyCandidate) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::Ai("No AI backend configured".into()))?;

        let prompt = self.build_prompt(candidate)?;

        tokio::time::timeout(self.timeout, client.generate(&prompt))
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }
}

#[async_trait]
impl ExplanationGenerator for AiExplainer {
    async fn explain(&self, candidate: &AnomalyCandidate) -> String {
        let transaction_id = candidate.transaction.id;

        match self.try_explain(candidate).await {
            Ok(text) => {
                debug!(transaction_id, "Generated explanation");
                text
            }
            Err(e) => {
                if self.client.is_some() {
                    warn!(transaction_id, error = %e, "Explanation request failed, using fallback");
                } else {
                    debug!(transaction_id, "No AI backend, using fallback explanation");
                }
                fallback_explanation(&candidate.reasons, candidate.transaction.category_label())
            }
        }
    }
}

/// Deterministic one-sentence explanation
///
/// Priority: amount, then category amount, then new/rare category, then generic.
pub fn fallback_explanation(reasons: &[AnomalyReason], category: &str) -> String {
    if reasons.contains(&AnomalyReason::Amount) {
        "This amount is much larger than your typical transaction.".to_string()
    } else if reasons.contains(&AnomalyReason::CategoryAmount) {
        format!("This amount is unusual for your {} spending.", category)
    } else if reasons.contains(&AnomalyReason::NewCategory)
        || reasons.contains(&AnomalyReason::RareCategory)
    {
        format!("You rarely spend in the {} category.", category)
    } else {
        "This transaction differs from your usual spending pattern.".to_string()
    }
}

/// Signed dollar amount, e.g. "$389.99" or "-$20.00"
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}
