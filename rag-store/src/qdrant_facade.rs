//! Thin adapter around `qdrant-client` implementing [`VectorStore`].
//!
//! This facade concentrates all Qdrant interactions behind a minimal API,
//! hiding away the verbose builder pattern and keeping the rest of the
//! library decoupled from `qdrant-client`.
//!
//! Each session gets its own collection. It is (re)created on the first
//! `add`, sized from the first vector, so a stale collection left behind by
//! an earlier process never leaks into a new session. [`VectorStore::release`]
//! deletes it when the session ends.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{DistanceKind, QdrantConfig};
use crate::document::{Document, ScoredDocument};
use crate::errors::RagError;
use crate::vector_store::VectorStore;

const PAYLOAD_TEXT: &str = "page_content";
const PAYLOAD_METADATA: &str = "metadata_json";

/// A per-session Qdrant collection.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    distance: DistanceKind,
    /// Vector size once the collection exists; also serializes creation.
    dim: Mutex<Option<usize>>,
    next_id: Mutex<u64>,
}

impl QdrantVectorStore {
    /// Creates the client. No collection is touched until the first `add`.
    pub fn connect(cfg: &QdrantConfig, collection: impl Into<String>) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&cfg.url);
        if let Some(key) = &cfg.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Qdrant(format!("client build: {e}")))?;

        Ok(Self {
            client,
            collection: collection.into(),
            distance: cfg.distance,
            dim: Mutex::new(None),
            next_id: Mutex::new(0),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Drops the collection (if present) and creates a fresh one of `size`.
    async fn reset_collection(&self, size: usize) -> Result<(), RagError> {
        info!(
            "Creating collection '{}' with size={} distance={:?}",
            self.collection, size, self.distance
        );

        if let Err(err) = self.client.delete_collection(&self.collection).await {
            debug!("delete_collection '{}' ignored: {}", self.collection, err);
        }

        let distance = match self.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(size as u64, distance)),
            )
            .await
            .map_err(|e| RagError::Qdrant(format!("create_collection: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn add(&self, docs: Vec<Document>, vectors: Vec<Vec<f32>>) -> Result<usize, RagError> {
        if docs.len() != vectors.len() {
            return Err(RagError::Embedding(format!(
                "{} documents but {} vectors",
                docs.len(),
                vectors.len()
            )));
        }
        let Some(first) = vectors.first() else {
            debug!("No points provided for upsert");
            return Ok(0);
        };

        let want = {
            let mut dim = self.dim.lock().await;
            match *dim {
                Some(d) => d,
                None => {
                    self.reset_collection(first.len()).await?;
                    *dim = Some(first.len());
                    first.len()
                }
            }
        };

        let mut next_id = self.next_id.lock().await;
        let mut points = Vec::with_capacity(docs.len());
        for (doc, vector) in docs.into_iter().zip(vectors) {
            if vector.len() != want {
                return Err(RagError::VectorSizeMismatch {
                    got: vector.len(),
                    want,
                });
            }
            let payload: Payload = json!({
                PAYLOAD_TEXT: doc.page_content,
                PAYLOAD_METADATA: serde_json::to_string(&doc.metadata)?,
            })
            .try_into()
            .map_err(|e| RagError::Qdrant(format!("payload convert: {e}")))?;
            points.push(PointStruct::new(*next_id, vector, payload));
            *next_id += 1;
        }

        let n = points.len();
        info!("Upserting {} points into collection '{}'", n, self.collection);
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| RagError::Qdrant(format!("upsert_points: {e}")))?;

        Ok(n)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>, RagError> {
        if self.dim.lock().await.is_none() {
            warn!("Search on empty collection '{}'", self.collection);
            return Ok(Vec::new());
        }

        let res = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| RagError::Qdrant(format!("search_points: {e}")))?;

        let mut out = Vec::with_capacity(res.result.len());
        for point in res.result {
            out.push(ScoredDocument {
                score: point.score,
                document: payload_to_document(point.payload)?,
            });
        }

        debug!("Search completed: {} hits returned", out.len());
        Ok(out)
    }

    async fn release(&self) -> Result<(), RagError> {
        let mut dim = self.dim.lock().await;
        if dim.is_none() {
            return Ok(());
        }
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| RagError::Qdrant(format!("delete_collection: {e}")))?;
        *dim = None;
        info!("Dropped collection '{}'", self.collection);
        Ok(())
    }
}

/// Rebuilds a [`Document`] from the two payload fields written by `add`.
fn payload_to_document(mut payload: HashMap<String, QValue>) -> Result<Document, RagError> {
    use qdrant_client::qdrant::value::Kind as K;

    let mut take_string = |key: &str| match payload.remove(key).and_then(|v| v.kind) {
        Some(K::StringValue(s)) => Some(s),
        _ => None,
    };

    let page_content = take_string(PAYLOAD_TEXT).unwrap_or_default();
    let metadata: BTreeMap<String, Value> = match take_string(PAYLOAD_METADATA) {
        Some(raw) => serde_json::from_str(&raw)?,
        None => BTreeMap::new(),
    };

    Ok(Document {
        page_content,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::value::Kind as K;

    fn string_value(s: &str) -> QValue {
        QValue {
            kind: Some(K::StringValue(s.to_string())),
        }
    }

    #[test]
    fn payload_round_trips_into_document() {
        let mut payload = HashMap::new();
        payload.insert(PAYLOAD_TEXT.to_string(), string_value("name: Widget"));
        payload.insert(
            PAYLOAD_METADATA.to_string(),
            string_value(r#"{"name":"Widget","row":0}"#),
        );

        let doc = payload_to_document(payload).unwrap();
        assert_eq!(doc.page_content, "name: Widget");
        assert_eq!(doc.metadata["row"], json!(0));
    }

    #[test]
    fn collection_name_is_session_scoped() {
        let cfg = QdrantConfig::new_default("http://localhost:6334");
        assert_eq!(cfg.collection_for("abc123"), "catalog_abc123");
    }
}
