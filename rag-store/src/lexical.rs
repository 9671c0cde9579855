//! Okapi BM25 lexical retriever.
//!
//! Scoring follows the classic Okapi formulation:
//! - `idf(t) = ln(N - df + 0.5) - ln(df + 0.5)`; terms present in more than
//!   half the corpus get a negative value, which is floored to
//!   `EPSILON * mean(idf)`
//! - `score(q, d) = Σ idf(t) * tf * (K1 + 1) / (tf + K1 * (1 - B + B * |d| / avgdl))`
//!
//! Every query returns `min(k, N)` documents, zero-score ones included, with
//! ties kept in corpus order.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::document::{Document, ScoredDocument};
use crate::errors::RagError;
use crate::preprocess::Preprocess;
use crate::retrieve::Retriever;

const K1: f32 = 1.5;
const B: f32 = 0.75;
const EPSILON: f32 = 0.25;

pub struct Bm25Retriever {
    docs: Vec<Document>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<f32>,
    avgdl: f32,
    idf: HashMap<String, f32>,
    preprocess: Preprocess,
    k: usize,
}

impl Bm25Retriever {
    /// Indexes `docs` by their page content.
    pub fn from_documents(docs: Vec<Document>, preprocess: Preprocess, k: usize) -> Self {
        let mut term_freqs = Vec::with_capacity(docs.len());
        let mut doc_lens = Vec::with_capacity(docs.len());
        let mut doc_freq: HashMap<String, u32> = HashMap::new();

        for doc in &docs {
            let mut tf: HashMap<String, u32> = HashMap::new();
            let tokens = preprocess(&doc.page_content);
            doc_lens.push(tokens.len() as f32);
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let n = docs.len() as f32;
        let avgdl = if docs.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<f32>() / n
        };

        let mut idf: HashMap<String, f32> = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let df = df as f32;
                (term, (n - df + 0.5).ln() - (df + 0.5).ln())
            })
            .collect();
        if !idf.is_empty() {
            let floor = EPSILON * idf.values().sum::<f32>() / idf.len() as f32;
            for value in idf.values_mut() {
                if *value < 0.0 {
                    *value = floor;
                }
            }
        }

        debug!(
            docs = docs.len(),
            vocabulary = idf.len(),
            avgdl,
            "Bm25Retriever indexed"
        );

        Self {
            docs,
            term_freqs,
            doc_lens,
            avgdl,
            idf,
            preprocess,
            k,
        }
    }

    /// BM25 score of every document for `query`, in corpus order.
    pub fn scores(&self, query: &str) -> Vec<f32> {
        let terms = (self.preprocess)(query);
        let mut scores = vec![0.0f32; self.docs.len()];
        if self.avgdl == 0.0 {
            return scores;
        }

        for term in &terms {
            let Some(idf) = self.idf.get(term) else {
                continue;
            };
            for (i, tf) in self.term_freqs.iter().enumerate() {
                let Some(&freq) = tf.get(term) else {
                    continue;
                };
                let freq = freq as f32;
                let norm = K1 * (1.0 - B + B * self.doc_lens[i] / self.avgdl);
                scores[i] += idf * freq * (K1 + 1.0) / (freq + norm);
            }
        }
        scores
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[async_trait]
impl Retriever for Bm25Retriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredDocument>, RagError> {
        let scores = self.scores(query);
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        order.truncate(self.k);

        trace!(hits = order.len(), "Bm25Retriever::retrieve");
        Ok(order
            .into_iter()
            .map(|i| ScoredDocument {
                score: scores[i],
                document: self.docs[i].clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::default_preprocess;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("name: 防水ジャケット\ncategory: アウター"),
            Document::new("name: ランニングシューズ\ncategory: 靴"),
            Document::new("name: 革靴\ncategory: 靴"),
            Document::new("name: ウールセーター\ncategory: トップス"),
        ]
    }

    #[tokio::test]
    async fn matching_document_ranks_first() {
        let bm25 = Bm25Retriever::from_documents(corpus(), default_preprocess(), 2);
        let hits = bm25.retrieve("ジャケット").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].document.page_content.contains("防水ジャケット"));
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn returns_k_even_without_matches() {
        let bm25 = Bm25Retriever::from_documents(corpus(), default_preprocess(), 3);
        let hits = bm25.retrieve("zzz").await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.score == 0.0));
        assert_eq!(hits[0].document, corpus()[0]);
    }

    #[test]
    fn common_terms_get_the_epsilon_floor() {
        let bm25 = Bm25Retriever::from_documents(corpus(), default_preprocess(), 4);
        // "name" occurs in every document, so its raw idf is negative.
        assert!(bm25.idf["name"] > 0.0);
        assert!(bm25.idf["ジャ"] > bm25.idf["name"]);
    }

    #[tokio::test]
    async fn empty_corpus_returns_nothing() {
        let bm25 = Bm25Retriever::from_documents(Vec::new(), default_preprocess(), 3);
        assert!(bm25.is_empty());
        assert!(bm25.retrieve("anything").await.unwrap().is_empty());
    }
}
