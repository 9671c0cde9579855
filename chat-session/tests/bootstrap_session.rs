use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ai_llm_service::AiLlmError;
use async_trait::async_trait;
use catalog_enricher::{CatalogEnricher, EnrichOutcome, SkipReason, StockClassifier};
use chat_session::{Bootstrapper, ChatMessage, Role, SessionRegistry};
use rag_store::{EmbeddingsProvider, HybridRetrieverBuilder, RagError, Retriever, RetrieverConfig};

#[derive(Default)]
struct CountingEmbedder {
    batches: AtomicUsize,
}

#[async_trait]
impl EmbeddingsProvider for CountingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
    }
}

#[derive(Default)]
struct AlwaysInStock {
    calls: AtomicUsize,
}

#[async_trait]
impl StockClassifier for AlwaysInStock {
    async fn classify(&self, _name: &str) -> Result<String, AiLlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("あり".into())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    catalog: std::path::PathBuf,
    embedder: Arc<CountingEmbedder>,
    classifier: Arc<AlwaysInStock>,
    bootstrapper: Bootstrapper,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("products.csv");
    fs::write(&catalog, "name,category\nWidget,tools\nGadget,toys\n").unwrap();

    let embedder = Arc::new(CountingEmbedder::default());
    let classifier = Arc::new(AlwaysInStock::default());
    let bootstrapper = Bootstrapper::new(
        &catalog,
        CatalogEnricher::new(classifier.clone()),
        HybridRetrieverBuilder::new(RetrieverConfig::new_default(), embedder.clone()),
    );
    Fixture {
        _dir: dir,
        catalog,
        embedder,
        classifier,
        bootstrapper,
    }
}

#[tokio::test]
async fn second_bootstrap_reuses_everything() {
    let fx = fixture();
    let registry = SessionRegistry::new();
    let ctx = registry.get_or_create("browser-tab").await;

    let first = {
        let mut ctx = ctx.lock().await;
        fx.bootstrapper.initialize(&mut ctx).await.unwrap()
    };
    assert!(first.retriever_built);
    assert!(matches!(first.enrichment, EnrichOutcome::Enriched(r) if r.rows == 2));
    assert_eq!(fx.embedder.batches.load(Ordering::SeqCst), 1);
    assert_eq!(fx.classifier.calls.load(Ordering::SeqCst), 2);

    ctx.lock()
        .await
        .push_message(ChatMessage::new(Role::User, "Widget はありますか"));

    let second = {
        let mut ctx = ctx.lock().await;
        fx.bootstrapper.initialize(&mut ctx).await.unwrap()
    };
    assert_eq!(second.session_id, first.session_id);
    assert!(!second.retriever_built);
    assert_eq!(
        second.enrichment,
        EnrichOutcome::Skipped(SkipReason::AlreadyEnriched)
    );
    assert_eq!(fx.embedder.batches.load(Ordering::SeqCst), 1);
    assert_eq!(fx.classifier.calls.load(Ordering::SeqCst), 2);
    assert_eq!(ctx.lock().await.messages().len(), 1);
}

#[tokio::test]
async fn sessions_get_their_own_ids_and_retrievers() {
    let fx = fixture();
    let registry = SessionRegistry::new();

    let a = registry.get_or_create("a").await;
    let b = registry.get_or_create("b").await;
    let sa = fx.bootstrapper.initialize(&mut *a.lock().await).await.unwrap();
    let sb = fx.bootstrapper.initialize(&mut *b.lock().await).await.unwrap();

    assert_ne!(sa.session_id, sb.session_id);
    assert!(sa.retriever_built && sb.retriever_built);
    assert_eq!(fx.embedder.batches.load(Ordering::SeqCst), 2);
    // The catalog is shared: only the first session enriches it.
    assert_eq!(sb.enrichment, EnrichOutcome::Skipped(SkipReason::AlreadyEnriched));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_sessions_enrich_the_catalog_once() {
    let fx = fixture();
    let registry = SessionRegistry::new();
    let a = registry.get_or_create("a").await;
    let b = registry.get_or_create("b").await;

    let (sa, sb) = tokio::join!(
        async { fx.bootstrapper.initialize(&mut *a.lock().await).await },
        async { fx.bootstrapper.initialize(&mut *b.lock().await).await },
    );
    let (sa, sb) = (sa.unwrap(), sb.unwrap());

    let enriched = [sa.enrichment, sb.enrichment]
        .iter()
        .filter(|e| matches!(e, EnrichOutcome::Enriched(_)))
        .count();
    assert_eq!(enriched, 1);
    assert_eq!(fx.classifier.calls.load(Ordering::SeqCst), 2);
    assert!(sa.retriever_built && sb.retriever_built);
}

#[tokio::test]
async fn bootstrapped_retriever_sees_enriched_catalog() {
    let fx = fixture();
    let registry = SessionRegistry::new();
    let ctx = registry.get_or_create("tab").await;
    let mut ctx = ctx.lock().await;
    fx.bootstrapper.initialize(&mut ctx).await.unwrap();

    assert_eq!(fx.bootstrapper.catalog(), fx.catalog.as_path());
    let retriever = ctx.retriever().cloned().unwrap();
    let hits = retriever.retrieve("Widget").await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits[0].document.page_content.contains("stock_status: あり"));
    assert_eq!(
        fs::read_to_string(&fx.catalog).unwrap(),
        "name,category,stock_status\nWidget,tools,あり\nGadget,toys,あり\n"
    );
}

#[tokio::test]
async fn failed_build_keeps_the_session_id() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.csv");
    let bootstrapper = Bootstrapper::new(
        &missing,
        CatalogEnricher::new(Arc::new(AlwaysInStock::default())),
        HybridRetrieverBuilder::new(
            RetrieverConfig::new_default(),
            Arc::new(CountingEmbedder::default()),
        ),
    );

    let registry = SessionRegistry::new();
    let ctx = registry.get_or_create("tab").await;
    let mut ctx = ctx.lock().await;
    assert!(bootstrapper.initialize(&mut ctx).await.is_err());
    let id = ctx.session_id().map(str::to_string);
    assert!(id.is_some());
    assert!(!ctx.has_retriever());

    assert!(bootstrapper.initialize(&mut ctx).await.is_err());
    assert_eq!(ctx.session_id().map(str::to_string), id);
}

#[tokio::test]
async fn ending_a_session_releases_its_retriever() {
    let fx = fixture();
    let registry = SessionRegistry::new();
    let ctx = registry.get_or_create("tab").await;
    fx.bootstrapper.initialize(&mut *ctx.lock().await).await.unwrap();

    assert!(fx.bootstrapper.end_session(&registry, "tab").await.unwrap());
    assert!(registry.is_empty().await);
    assert!(!ctx.lock().await.has_retriever());
    assert!(!fx.bootstrapper.end_session(&registry, "tab").await.unwrap());
}
