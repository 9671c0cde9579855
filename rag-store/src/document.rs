//! Core data models used by the library.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One catalog row turned into retrievable text plus metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text body that is embedded and indexed lexically.
    pub page_content: String,
    /// `source`, `row`, and every CSV column of the originating row.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A retrieval hit: the document and the score assigned by the retriever
/// that produced it (similarity, BM25, or fused rank score).
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredDocument {
    pub score: f32,
    pub document: Document,
}
