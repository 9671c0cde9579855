use ai_llm_service::AiLlmError;
use catalog_enricher::EnrichError;
use rag_store::RagError;
use thiserror::Error;

/// Errors raised while configuring or bootstrapping a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Environment variable present but unusable.
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Env {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("catalog enrichment failed: {0}")]
    Enrich(#[from] EnrichError),

    #[error("retriever build failed: {0}")]
    Retriever(#[from] RagError),

    #[error(transparent)]
    Llm(#[from] AiLlmError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The global logger could not be installed.
    #[error("telemetry init failed: {0}")]
    Telemetry(String),
}
