//! Hybrid retrieval over a CSV product catalog.
//!
//! This crate provides:
//! - Catalog loading (one [`Document`] per CSV row) and legacy-encoding sanitizing
//! - Embedding through [`EmbeddingsProvider`] into a [`VectorStore`] (in-memory or Qdrant)
//! - Okapi BM25 lexical retrieval
//! - Weighted Reciprocal Rank Fusion of both in an [`EnsembleRetriever`]
//!
//! [`HybridRetrieverBuilder`] wires everything together for one session.

pub mod builder;
pub mod config;
pub mod document;
pub mod embed;
pub mod ensemble;
pub mod errors;
pub mod io_csv;
pub mod lexical;
pub mod preprocess;
pub mod qdrant_facade;
pub mod retrieve;
pub mod sanitize;
pub mod vector_store;

pub use builder::HybridRetrieverBuilder;
pub use config::{DistanceKind, QdrantConfig, RetrieverConfig, RetrieverWeights, VectorBackend};
pub use document::{Document, ScoredDocument};
pub use embed::{EmbeddingsProvider, llm_embedder::LlmEmbedder};
pub use ensemble::EnsembleRetriever;
pub use errors::RagError;
pub use io_csv::load_csv_documents;
pub use lexical::Bm25Retriever;
pub use preprocess::{Preprocess, default_preprocess};
pub use qdrant_facade::QdrantVectorStore;
pub use retrieve::{Retriever, VectorStoreRetriever};
pub use sanitize::Sanitizer;
pub use vector_store::{InMemoryVectorStore, VectorStore};
