//! Session bootstrap: id, catalog enrichment, retriever.
//!
//! Every step is guarded on its own, so calling [`Bootstrapper::initialize`]
//! on every request is cheap once a session is warm:
//! - the id is generated only when absent
//! - enrichment is a no-op once the catalog has its `stock_status` column
//! - the retriever is built only when the context has none

use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalog_enricher::{CatalogEnricher, EnrichOutcome};
use rag_store::{HybridRetrieverBuilder, Retriever, VectorBackend};
use tracing::{Span, info, instrument};

use crate::errors::SessionError;
use crate::registry::SessionRegistry;
use crate::session::SessionContext;

/// What a call to [`Bootstrapper::initialize`] actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSummary {
    pub session_id: String,
    pub enrichment: EnrichOutcome,
    /// `false` when the session already had a retriever.
    pub retriever_built: bool,
}

pub struct Bootstrapper {
    catalog: PathBuf,
    enricher: CatalogEnricher,
    builder: HybridRetrieverBuilder,
}

impl Bootstrapper {
    pub fn new(
        catalog: impl Into<PathBuf>,
        enricher: CatalogEnricher,
        builder: HybridRetrieverBuilder,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            enricher,
            builder,
        }
    }

    pub fn catalog(&self) -> &Path {
        &self.catalog
    }

    /// Brings `ctx` to a ready state. Safe to call repeatedly.
    ///
    /// # Errors
    /// Enrichment and retriever failures propagate; the context keeps
    /// whatever was completed before the failure (the id in particular).
    #[instrument(name = "initialize", skip_all, fields(session_id = tracing::field::Empty))]
    pub async fn initialize(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<BootstrapSummary, SessionError> {
        let session_id = ctx.ensure_session_id().to_string();
        Span::current().record("session_id", session_id.as_str());

        let enrichment = self.enricher.enrich(&self.catalog).await?;
        if let EnrichOutcome::Enriched(report) = &enrichment {
            info!(
                rows = report.rows,
                fallbacks = report.fallbacks,
                "catalog enriched for session"
            );
        }

        let retriever_built = if ctx.has_retriever() {
            false
        } else {
            let collection = self.collection_name(&session_id);
            let retriever = self.builder.build(&self.catalog, &collection).await?;
            ctx.set_retriever(Arc::new(retriever))
        };

        info!(
            retriever_built,
            history = ctx.messages().len(),
            "session ready"
        );
        Ok(BootstrapSummary {
            session_id,
            enrichment,
            retriever_built,
        })
    }

    /// Removes `key` from `registry` and releases its retriever, which drops
    /// the session's Qdrant collection. Returns `false` for an unknown key.
    #[instrument(skip(self, registry))]
    pub async fn end_session(
        &self,
        registry: &SessionRegistry,
        key: &str,
    ) -> Result<bool, SessionError> {
        let Some(ctx) = registry.remove(key).await else {
            return Ok(false);
        };
        let retriever = ctx.lock().await.take_retriever();
        if let Some(retriever) = retriever {
            retriever.release().await?;
            info!("session retriever released");
        }
        Ok(true)
    }

    fn collection_name(&self, session_id: &str) -> String {
        match &self.builder.config().backend {
            VectorBackend::Qdrant(q) => q.collection_for(session_id),
            VectorBackend::Memory => session_id.to_string(),
        }
    }
}
