//! Retriever and vector-store configuration.

use crate::errors::RagError;

/// Distance function used for the Qdrant vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

impl DistanceKind {
    /// Parses a case-insensitive name; unknown values fall back to Cosine.
    pub fn parse_or_cosine(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "dot" | "dotproduct" => DistanceKind::Dot,
            "euclid" | "l2" => DistanceKind::Euclid,
            _ => DistanceKind::Cosine,
        }
    }
}

/// Qdrant connectivity for the per-session catalog collection.
#[derive(Clone, Debug)]
pub struct QdrantConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub url: String,
    /// Optional API key for Qdrant Cloud.
    pub api_key: Option<String>,
    /// Collections are named `{prefix}_{session_id}`.
    pub collection_prefix: String,
    /// Distance function (Cosine by default).
    pub distance: DistanceKind,
}

impl QdrantConfig {
    pub fn new_default(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            collection_prefix: "catalog".into(),
            distance: DistanceKind::Cosine,
        }
    }

    pub fn collection_for(&self, session_id: &str) -> String {
        format!("{}_{}", self.collection_prefix, session_id)
    }
}

/// Where document vectors live for the lifetime of a session.
#[derive(Clone, Debug)]
pub enum VectorBackend {
    /// Process-local brute-force cosine store.
    Memory,
    /// A Qdrant collection per session.
    Qdrant(QdrantConfig),
}

/// Weight pair for the ensemble, in retriever order: lexical first, vector second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetrieverWeights {
    pub lexical: f32,
    pub vector: f32,
}

impl RetrieverWeights {
    pub fn new(lexical: f32, vector: f32) -> Self {
        Self { lexical, vector }
    }

    /// Parses `"0.5,0.5"` (lexical, vector).
    pub fn parse(s: &str) -> Result<Self, RagError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(RagError::Config(format!(
                "retriever weights must be two comma-separated numbers, got '{s}'"
            )));
        }
        let parse = |p: &str| {
            p.parse::<f32>()
                .map_err(|_| RagError::Config(format!("invalid retriever weight '{p}'")))
        };
        let weights = Self::new(parse(parts[0])?, parse(parts[1])?);
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), RagError> {
        let ok = |w: f32| w.is_finite() && w >= 0.0;
        if !ok(self.lexical) || !ok(self.vector) {
            return Err(RagError::Config(
                "retriever weights must be finite and non-negative".into(),
            ));
        }
        if self.lexical == 0.0 && self.vector == 0.0 {
            return Err(RagError::Config(
                "at least one retriever weight must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RetrieverWeights {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

/// Configuration for building the hybrid retriever.
#[derive(Clone, Debug)]
pub struct RetrieverConfig {
    /// Results returned by each retriever and by the ensemble.
    pub top_k: usize,
    /// Ensemble weights (lexical, vector).
    pub weights: RetrieverWeights,
    /// Vector store selection.
    pub backend: VectorBackend,
}

impl RetrieverConfig {
    pub fn new_default() -> Self {
        Self {
            top_k: 5,
            weights: RetrieverWeights::default(),
            backend: VectorBackend::Memory,
        }
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be > 0".into()));
        }
        self.weights.validate()?;
        if let VectorBackend::Qdrant(q) = &self.backend {
            if q.url.trim().is_empty() {
                return Err(RagError::Config("qdrant url is empty".into()));
            }
            if q.collection_prefix.trim().is_empty() {
                return Err(RagError::Config("qdrant collection prefix is empty".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_parse_in_lexical_vector_order() {
        let w = RetrieverWeights::parse("0.3, 0.7").unwrap();
        assert_eq!(w, RetrieverWeights::new(0.3, 0.7));
    }

    #[test]
    fn weights_reject_bad_input() {
        assert!(RetrieverWeights::parse("0.5").is_err());
        assert!(RetrieverWeights::parse("a,b").is_err());
        assert!(RetrieverWeights::parse("-1,2").is_err());
        assert!(RetrieverWeights::parse("0,0").is_err());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut cfg = RetrieverConfig::new_default();
        cfg.top_k = 0;
        assert!(cfg.validate().is_err());
    }
}
