//! Vector store abstraction plus the process-local implementation.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Document, ScoredDocument};
use crate::errors::RagError;

/// Storage for embedded documents with top-K similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Stores `docs[i]` under `vectors[i]`. Returns the number stored.
    async fn add(&self, docs: Vec<Document>, vectors: Vec<Vec<f32>>) -> Result<usize, RagError>;

    /// Returns at most `k` documents, most similar first.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>, RagError>;

    /// Frees server-side resources held for this store. No-op by default.
    async fn release(&self) -> Result<(), RagError> {
        Ok(())
    }
}

/// Brute-force cosine store kept in memory for the lifetime of the session.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<(Document, Vec<f32>)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, docs: Vec<Document>, vectors: Vec<Vec<f32>>) -> Result<usize, RagError> {
        if docs.len() != vectors.len() {
            return Err(RagError::Embedding(format!(
                "{} documents but {} vectors",
                docs.len(),
                vectors.len()
            )));
        }

        let mut entries = self.entries.write().await;
        let want = entries
            .first()
            .map(|(_, v)| v.len())
            .or_else(|| vectors.first().map(Vec::len));
        if let Some(want) = want {
            if let Some(v) = vectors.iter().find(|v| v.len() != want) {
                return Err(RagError::VectorSizeMismatch { got: v.len(), want });
            }
        }

        let n = docs.len();
        entries.extend(docs.into_iter().zip(vectors));
        debug!(added = n, total = entries.len(), "InMemoryVectorStore::add");
        Ok(n)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>, RagError> {
        let entries = self.entries.read().await;
        if let Some((_, v)) = entries.first() {
            if v.len() != query.len() {
                return Err(RagError::VectorSizeMismatch {
                    got: query.len(),
                    want: v.len(),
                });
            }
        }

        let mut hits: Vec<ScoredDocument> = entries
            .iter()
            .map(|(doc, v)| ScoredDocument {
                score: cosine(query, v),
                document: doc.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_orders_by_cosine_and_truncates() {
        let store = InMemoryVectorStore::new();
        store
            .add(
                vec![Document::new("x"), Document::new("y"), Document::new("xy")],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            )
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.page_content, "x");
        assert_eq!(hits[1].document.page_content, "xy");
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected() {
        let store = InMemoryVectorStore::new();
        let err = store
            .add(
                vec![Document::new("a"), Document::new("b")],
                vec![vec![1.0, 0.0], vec![1.0]],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 1, want: 2 }));
        assert_eq!(store.len().await, 0);
    }
}
