//! Retrieval seam: anything that turns a text query into ranked documents.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::document::ScoredDocument;
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::vector_store::VectorStore;

/// Ranked document lookup for a free-text query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns documents most relevant first.
    ///
    /// # Errors
    /// Propagates embedding, store, or lexical failures.
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredDocument>, RagError>;

    /// Frees backing resources once the retriever is no longer used.
    async fn release(&self) -> Result<(), RagError> {
        Ok(())
    }
}

/// Embeds the query and runs a top-K similarity search against a store.
pub struct VectorStoreRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
    k: usize,
}

impl VectorStoreRetriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
        k: usize,
    ) -> Self {
        Self { store, embedder, k }
    }
}

#[async_trait]
impl Retriever for VectorStoreRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredDocument>, RagError> {
        trace!("VectorStoreRetriever::retrieve k={}", self.k);
        let qv = self.embedder.embed(query).await?;
        let hits = self.store.search(&qv, self.k).await?;
        trace!("VectorStoreRetriever::retrieve hits={}", hits.len());
        Ok(hits)
    }

    async fn release(&self) -> Result<(), RagError> {
        self.store.release().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::vector_store::InMemoryVectorStore;

    /// Maps text to a 2-d vector: x counts 'a', y counts 'b'.
    struct LetterEmbedder;

    #[async_trait]
    impl EmbeddingsProvider for LetterEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let a = t.matches('a').count() as f32;
                    let b = t.matches('b').count() as f32;
                    vec![a, b]
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn query_is_embedded_and_searched() {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .add(
                vec![Document::new("aaa"), Document::new("bbb")],
                vec![vec![3.0, 0.0], vec![0.0, 3.0]],
            )
            .await
            .unwrap();

        let retriever = VectorStoreRetriever::new(store, Arc::new(LetterEmbedder), 1);
        let hits = retriever.retrieve("bb").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.page_content, "bbb");
    }
}
