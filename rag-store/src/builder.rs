//! Builds the per-session hybrid (BM25 + vector) retriever from a catalog CSV.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{RetrieverConfig, VectorBackend};
use crate::embed::EmbeddingsProvider;
use crate::ensemble::EnsembleRetriever;
use crate::errors::RagError;
use crate::io_csv::load_csv_documents;
use crate::lexical::Bm25Retriever;
use crate::preprocess::{Preprocess, default_preprocess};
use crate::qdrant_facade::QdrantVectorStore;
use crate::retrieve::{Retriever, VectorStoreRetriever};
use crate::sanitize::Sanitizer;
use crate::vector_store::{InMemoryVectorStore, VectorStore};

pub struct HybridRetrieverBuilder {
    cfg: RetrieverConfig,
    embedder: Arc<dyn EmbeddingsProvider>,
    sanitizer: Sanitizer,
    preprocess: Preprocess,
}

impl HybridRetrieverBuilder {
    pub fn new(cfg: RetrieverConfig, embedder: Arc<dyn EmbeddingsProvider>) -> Self {
        Self {
            cfg,
            embedder,
            sanitizer: Sanitizer::for_host(),
            preprocess: default_preprocess(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_preprocess(mut self, preprocess: Preprocess) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.cfg
    }

    /// Loads `catalog`, sanitizes it, embeds it once, and returns the fused
    /// lexical + vector retriever.
    ///
    /// `collection` names the Qdrant collection when that backend is selected
    /// and is ignored for the in-memory store.
    ///
    /// # Errors
    /// Config validation, CSV, embedding, and store failures.
    #[instrument(skip(self), fields(backend = tracing::field::Empty))]
    pub async fn build(
        &self,
        catalog: &Path,
        collection: &str,
    ) -> Result<EnsembleRetriever, RagError> {
        self.cfg.validate()?;

        let docs: Vec<_> = load_csv_documents(catalog)?
            .into_iter()
            .map(|d| self.sanitizer.sanitize_document(d))
            .collect();
        info!(
            "Building hybrid retriever over {} documents (legacy encoding: {})",
            docs.len(),
            self.sanitizer.is_legacy()
        );

        let store: Arc<dyn VectorStore> = match &self.cfg.backend {
            VectorBackend::Memory => {
                tracing::Span::current().record("backend", "memory");
                Arc::new(InMemoryVectorStore::new())
            }
            VectorBackend::Qdrant(q) => {
                tracing::Span::current().record("backend", "qdrant");
                Arc::new(QdrantVectorStore::connect(q, collection)?)
            }
        };

        if !docs.is_empty() {
            let texts: Vec<String> = docs.iter().map(|d| d.page_content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            let stored = store.add(docs.clone(), vectors).await?;
            info!("Stored {} document vectors", stored);
        }

        let vector: Arc<dyn Retriever> = Arc::new(VectorStoreRetriever::new(
            store,
            self.embedder.clone(),
            self.cfg.top_k,
        ));
        let lexical: Arc<dyn Retriever> = Arc::new(Bm25Retriever::from_documents(
            docs,
            self.preprocess.clone(),
            self.cfg.top_k,
        ));

        let weights = self.cfg.weights;
        EnsembleRetriever::new(
            vec![lexical, vector],
            vec![weights.lexical, weights.vector],
            self.cfg.top_k,
        )
    }
}
