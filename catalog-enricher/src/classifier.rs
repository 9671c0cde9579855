//! The LLM collaborator that labels one product.

use std::sync::Arc;

use ai_llm_service::{AiLlmError, LlmServiceProfiles};
use async_trait::async_trait;
use tracing::trace;

use crate::stock_status::{SYSTEM_PROMPT, user_prompt};

/// Produces a raw stock-status answer for a product name.
///
/// The answer is not validated here; the enricher trims it and falls back
/// when it is outside the allowed labels.
#[async_trait]
pub trait StockClassifier: Send + Sync {
    async fn classify(&self, name: &str) -> Result<String, AiLlmError>;
}

/// Classifier backed by the `chat` profile of [`LlmServiceProfiles`].
#[derive(Clone)]
pub struct LlmStockClassifier {
    svc: Arc<LlmServiceProfiles>,
}

impl LlmStockClassifier {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl StockClassifier for LlmStockClassifier {
    async fn classify(&self, name: &str) -> Result<String, AiLlmError> {
        trace!(name, "LlmStockClassifier::classify");
        self.svc
            .generate(&user_prompt(name), Some(SYSTEM_PROMPT))
            .await
    }
}
