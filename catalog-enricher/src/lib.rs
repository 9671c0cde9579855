//! Catalog enrichment: label every product with a generated stock status.
//!
//! - [`stock_status`]: the three allowed labels and the classification prompt
//! - [`classifier`]: the [`StockClassifier`] seam and its LLM-backed implementation
//! - [`retry`]: exponential backoff for transient LLM failures
//! - [`checkpoint`]: sidecar progress file for resumable runs
//! - [`enrich`]: [`CatalogEnricher`], which reads, classifies and atomically rewrites the CSV

pub mod checkpoint;
pub mod classifier;
pub mod enrich;
pub mod errors;
pub mod retry;
pub mod stock_status;

pub use checkpoint::{Checkpoint, CheckpointEntry};
pub use classifier::{LlmStockClassifier, StockClassifier};
pub use enrich::{CatalogEnricher, EnrichOptions, EnrichOutcome, EnrichReport, SkipReason};
pub use errors::EnrichError;
pub use retry::RetryPolicy;
pub use stock_status::{STOCK_STATUS_COLUMN, StockStatus};
