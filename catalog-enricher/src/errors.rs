//! Error type for catalog enrichment.

use ai_llm_service::AiLlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Checkpoint line could not be encoded or decoded.
    #[error("checkpoint error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required header is absent while the catalog has data rows.
    #[error("catalog has no '{0}' column")]
    MissingColumn(&'static str),

    /// A data row has more fields than the header; `row` is 0-based.
    #[error("catalog row {row} has {fields} fields but the header has {header}")]
    RowTooLong {
        row: usize,
        fields: usize,
        header: usize,
    },

    /// Classification failed for a row after all retries.
    #[error("classification failed for row {row} ('{name}'): {source}")]
    Classify {
        row: usize,
        name: String,
        #[source]
        source: AiLlmError,
    },

    #[error("invalid enrich options: {0}")]
    Options(String),
}
