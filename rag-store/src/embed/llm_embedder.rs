//! Embedding provider backed by the shared [`LlmServiceProfiles`].

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use async_trait::async_trait;
use tracing::debug;

use crate::{EmbeddingsProvider, RagError};

/// Embeds through the `embedding` profile (OpenAI or Ollama).
#[derive(Clone)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    /// Expected embedding dimension, checked on every vector when set.
    dim: Option<usize>,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc, dim: None }
    }

    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dim = Some(dim);
        self
    }
}

#[async_trait]
impl EmbeddingsProvider for LlmEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        debug!(inputs = texts.len(), "LlmEmbedder::embed_batch");
        let vectors = self.svc.embed_batch(texts).await?;

        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(want) = self.dim {
            if let Some(v) = vectors.iter().find(|v| v.len() != want) {
                return Err(RagError::VectorSizeMismatch { got: v.len(), want });
            }
        }
        Ok(vectors)
    }
}
