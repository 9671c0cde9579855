//! Application configuration read from the environment.
//!
//! Every variable is optional. A missing variable takes its default; a
//! present but malformed one is an error rather than a silent default.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use catalog_enricher::{EnrichOptions, RetryPolicy};
use rag_store::{DistanceKind, QdrantConfig, RetrieverConfig, RetrieverWeights, VectorBackend};

use crate::errors::SessionError;

/// Logging destination and naming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    /// Directory holding the log files; created on startup.
    pub dir: PathBuf,
    /// Base file name; the daily rotation appends the date.
    pub file_name: String,
    /// Application logger name, recorded on the root span of every line.
    pub logger_name: String,
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "application.log".into(),
            logger_name: "catalog_assistant".into(),
            default_filter: "info".into(),
        }
    }
}

/// Everything the binary needs to bootstrap sessions.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Catalog CSV (`RAG_SOURCE_PATH`).
    pub catalog_path: PathBuf,
    pub log: LogConfig,
    pub retriever: RetrieverConfig,
    pub enrich: EnrichOptions,
}

impl AppConfig {
    /// Loads configuration from process environment variables.
    ///
    /// Recognized variables:
    /// - `RAG_SOURCE_PATH` (default: `data/products.csv`)
    /// - `LOG_DIR_PATH` (default: `logs`), `LOG_FILE` (default: `application.log`)
    /// - `LOGGER_NAME` (default: `catalog_assistant`)
    /// - `RAG_TOP_K` (default: 5)
    /// - `RETRIEVER_WEIGHTS` (default: `0.5,0.5`, lexical then vector)
    /// - `VECTOR_BACKEND` (`memory` | `qdrant`, default: `memory`)
    /// - `QDRANT_URL` (default: `http://localhost:6334`), `QDRANT_API_KEY`,
    ///   `QDRANT_COLLECTION_PREFIX` (default: `catalog`), `QDRANT_DISTANCE`
    /// - `ENRICH_BATCH_SIZE` (16), `ENRICH_CONCURRENCY` (4),
    ///   `ENRICH_MAX_ATTEMPTS` (3), `ENRICH_BACKOFF_MS` (500)
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = LogConfig::default();
        let log = LogConfig {
            dir: get("LOG_DIR_PATH").map(PathBuf::from).unwrap_or(defaults.dir),
            file_name: get("LOG_FILE").unwrap_or(defaults.file_name),
            logger_name: get("LOGGER_NAME").unwrap_or(defaults.logger_name),
            default_filter: defaults.default_filter,
        };

        let weights = match get("RETRIEVER_WEIGHTS") {
            Some(raw) => RetrieverWeights::parse(&raw).map_err(|e| SessionError::Env {
                key: "RETRIEVER_WEIGHTS",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => RetrieverWeights::default(),
        };

        let backend = match get("VECTOR_BACKEND").map(|v| v.trim().to_lowercase()) {
            None => VectorBackend::Memory,
            Some(v) if v == "memory" => VectorBackend::Memory,
            Some(v) if v == "qdrant" => {
                let mut q = QdrantConfig::new_default(
                    get("QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".into()),
                );
                q.api_key = get("QDRANT_API_KEY");
                if let Some(prefix) = get("QDRANT_COLLECTION_PREFIX") {
                    q.collection_prefix = prefix;
                }
                if let Some(d) = get("QDRANT_DISTANCE") {
                    q.distance = DistanceKind::parse_or_cosine(&d);
                }
                VectorBackend::Qdrant(q)
            }
            Some(other) => {
                return Err(SessionError::Env {
                    key: "VECTOR_BACKEND",
                    value: other,
                    reason: "expected 'memory' or 'qdrant'".into(),
                });
            }
        };

        let retriever = RetrieverConfig {
            top_k: read_num(&get, "RAG_TOP_K", 5)?,
            weights,
            backend,
        };
        retriever.validate().map_err(|e| SessionError::Env {
            key: "RAG_TOP_K",
            value: retriever.top_k.to_string(),
            reason: e.to_string(),
        })?;

        let base = RetryPolicy::default();
        let enrich = EnrichOptions {
            batch_size: read_num(&get, "ENRICH_BATCH_SIZE", 16)?,
            concurrency: read_num(&get, "ENRICH_CONCURRENCY", 4)?,
            retry: RetryPolicy {
                max_attempts: read_num(&get, "ENRICH_MAX_ATTEMPTS", 3u32)?,
                base_delay: Duration::from_millis(read_num(&get, "ENRICH_BACKOFF_MS", 500u64)?),
                max_delay: base.max_delay,
            },
        };
        enrich.validate().map_err(|e| SessionError::Env {
            key: "ENRICH_*",
            value: format!("{enrich:?}"),
            reason: e.to_string(),
        })?;

        Ok(Self {
            catalog_path: get("RAG_SOURCE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/products.csv")),
            log,
            retriever,
            enrich,
        })
    }
}

/// Reads a number, falling back to `default` when the variable is unset.
fn read_num<G, T: FromStr>(get: &G, key: &'static str, default: T) -> Result<T, SessionError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v.trim().parse::<T>().map_err(|_| SessionError::Env {
            key,
            value: v,
            reason: "expected a non-negative integer".into(),
        }),
        None => Ok(default),
    }
}
