//! Weighted Reciprocal Rank Fusion over several retrievers.
//!
//! Each retriever contributes `weight / (RRF_C + rank)` (rank is 1-based) to
//! every document it returns. Documents are keyed by `page_content`; the
//! first retriever to return a document supplies its metadata. Ties keep the
//! order in which documents were first seen.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::trace;

use crate::document::{Document, ScoredDocument};
use crate::errors::RagError;
use crate::retrieve::Retriever;

/// RRF smoothing constant.
pub const RRF_C: f32 = 60.0;

pub struct EnsembleRetriever {
    retrievers: Vec<Arc<dyn Retriever>>,
    weights: Vec<f32>,
    k: usize,
}

impl std::fmt::Debug for EnsembleRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleRetriever")
            .field("retrievers", &self.retrievers.len())
            .field("weights", &self.weights)
            .field("k", &self.k)
            .finish()
    }
}

impl EnsembleRetriever {
    /// `weights[i]` applies to `retrievers[i]`; the fused list is cut to `k`.
    pub fn new(
        retrievers: Vec<Arc<dyn Retriever>>,
        weights: Vec<f32>,
        k: usize,
    ) -> Result<Self, RagError> {
        if retrievers.is_empty() {
            return Err(RagError::Config("ensemble needs at least one retriever".into()));
        }
        if retrievers.len() != weights.len() {
            return Err(RagError::Config(format!(
                "{} retrievers but {} weights",
                retrievers.len(),
                weights.len()
            )));
        }
        Ok(Self {
            retrievers,
            weights,
            k,
        })
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn top_k(&self) -> usize {
        self.k
    }
}

#[async_trait]
impl Retriever for EnsembleRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredDocument>, RagError> {
        let lists = try_join_all(self.retrievers.iter().map(|r| r.retrieve(query))).await?;
        let fused = fuse(lists, &self.weights, self.k);
        trace!("EnsembleRetriever::retrieve fused={}", fused.len());
        Ok(fused)
    }

    async fn release(&self) -> Result<(), RagError> {
        try_join_all(self.retrievers.iter().map(|r| r.release())).await?;
        Ok(())
    }
}

fn rrf_contribution(weight: f32, rank: usize) -> f32 {
    weight / (RRF_C + rank as f32)
}

/// Fuses ranked lists; `lists[i]` is scored with `weights[i]`.
pub fn fuse(lists: Vec<Vec<ScoredDocument>>, weights: &[f32], k: usize) -> Vec<ScoredDocument> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut fused: Vec<(Document, f32)> = Vec::new();

    for (list, &weight) in lists.into_iter().zip(weights) {
        for (idx, hit) in list.into_iter().enumerate() {
            let contribution = rrf_contribution(weight, idx + 1);
            match index.get(&hit.document.page_content) {
                Some(&pos) => fused[pos].1 += contribution,
                None => {
                    index.insert(hit.document.page_content.clone(), fused.len());
                    fused.push((hit.document, contribution));
                }
            }
        }
    }

    let mut out: Vec<ScoredDocument> = fused
        .into_iter()
        .map(|(document, score)| ScoredDocument { score, document })
        .collect();
    // Stable: equal scores stay in first-seen order.
    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    out.truncate(k);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(texts: &[&str]) -> Vec<ScoredDocument> {
        texts
            .iter()
            .map(|t| ScoredDocument {
                score: 1.0,
                document: Document::new(*t),
            })
            .collect()
    }

    fn contents(out: &[ScoredDocument]) -> Vec<&str> {
        out.iter().map(|h| h.document.page_content.as_str()).collect()
    }

    struct Fixed(Vec<ScoredDocument>);

    #[async_trait]
    impl Retriever for Fixed {
        async fn retrieve(&self, _query: &str) -> Result<Vec<ScoredDocument>, RagError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl Retriever for Failing {
        async fn retrieve(&self, _query: &str) -> Result<Vec<ScoredDocument>, RagError> {
            Err(RagError::Embedding("down".into()))
        }
    }

    #[test]
    fn shared_documents_accumulate_score() {
        let out = fuse(
            vec![hits(&["a", "b", "c"]), hits(&["c", "d"])],
            &[0.5, 0.5],
            10,
        );
        assert_eq!(contents(&out)[0], "c");
        let c = 0.5 / 63.0 + 0.5 / 61.0;
        assert!((out[0].score - c).abs() < 1e-6);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let out = fuse(vec![hits(&["a"]), hits(&["b"])], &[0.5, 0.5], 10);
        assert_eq!(contents(&out), vec!["a", "b"]);
    }

    #[test]
    fn weights_change_the_winner() {
        let out = fuse(vec![hits(&["a"]), hits(&["b"])], &[0.2, 0.8], 10);
        assert_eq!(contents(&out), vec!["b", "a"]);
    }

    #[test]
    fn disjoint_lists_are_cut_to_k() {
        let out = fuse(
            vec![hits(&["a", "b", "c"]), hits(&["d", "e", "f"])],
            &[0.5, 0.5],
            3,
        );
        assert_eq!(out.len(), 3);
        assert_eq!(contents(&out), vec!["a", "d", "b"]);
    }

    #[test]
    fn constructor_rejects_mismatched_weights() {
        let r: Arc<dyn Retriever> = Arc::new(Fixed(Vec::new()));
        assert!(EnsembleRetriever::new(vec![r], vec![0.5, 0.5], 3).is_err());
        assert!(EnsembleRetriever::new(Vec::new(), Vec::new(), 3).is_err());
    }

    #[tokio::test]
    async fn retrieve_fans_out_and_propagates_errors() {
        let ok = EnsembleRetriever::new(
            vec![
                Arc::new(Fixed(hits(&["x", "y"]))),
                Arc::new(Fixed(hits(&["y"]))),
            ],
            vec![0.5, 0.5],
            5,
        )
        .unwrap();
        let out = ok.retrieve("q").await.unwrap();
        assert_eq!(contents(&out), vec!["y", "x"]);

        let broken = EnsembleRetriever::new(
            vec![Arc::new(Fixed(hits(&["x"]))), Arc::new(Failing)],
            vec![0.5, 0.5],
            5,
        )
        .unwrap();
        assert!(broken.retrieve("q").await.is_err());
    }

    #[derive(Default)]
    struct Releasable(std::sync::atomic::AtomicUsize);

    #[async_trait]
    impl Retriever for Releasable {
        async fn retrieve(&self, _query: &str) -> Result<Vec<ScoredDocument>, RagError> {
            Ok(Vec::new())
        }

        async fn release(&self) -> Result<(), RagError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn release_reaches_every_member() {
        let a = Arc::new(Releasable::default());
        let b = Arc::new(Releasable::default());
        let ensemble = EnsembleRetriever::new(
            vec![a.clone(), b.clone(), Arc::new(Fixed(Vec::new()))],
            vec![0.3, 0.3, 0.4],
            5,
        )
        .unwrap();

        ensemble.release().await.unwrap();
        assert_eq!(a.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(b.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
