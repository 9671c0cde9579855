use async_trait::async_trait;

use crate::errors::RagError;

pub mod llm_embedder;

/// Provider interface for embedding generation.
///
/// Async is required because real providers (OpenAI, Ollama) perform HTTP
/// requests. Implement this trait to plug in another backend or a test stub.
#[async_trait]
pub trait EmbeddingsProvider: Send + Sync {
    /// Embeds every text in one call; the result lines up with `texts`.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embeds a single text (query side).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop()
            .ok_or_else(|| RagError::Embedding("provider returned no vector".into()))
    }
}
