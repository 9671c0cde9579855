use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use ai_llm_service::config::default_config::{
    config_classifier_from_env, config_embedding_from_env,
};
use catalog_enricher::{CatalogEnricher, EnrichOutcome, LlmStockClassifier};
use chat_session::{AppConfig, Bootstrapper, ChatMessage, Role, SessionRegistry, telemetry};
use clap::Parser;
use colored::Colorize;
use rag_store::{HybridRetrieverBuilder, LlmEmbedder, Retriever};
use tracing::{Instrument, info, info_span};

/// Bootstraps a catalog-assistant session and optionally runs one retrieval.
#[derive(Parser, Debug)]
#[command(name = "catalog-assistant", version)]
struct Cli {
    /// Host-side session key; the same key reuses the same session state.
    #[arg(long, default_value = "local")]
    session: String,

    /// Query to run against the session's retriever after bootstrap.
    #[arg(long)]
    query: Option<String>,

    /// Catalog CSV path (overrides RAG_SOURCE_PATH).
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine: variables may come from the process environment.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    let cli = Cli::parse();
    let mut cfg = AppConfig::from_env()?;
    if let Some(path) = cli.catalog.clone() {
        cfg.catalog_path = path;
    }

    let _guard = telemetry::init(&cfg.log)?;
    let root = info_span!("app", logger = %cfg.log.logger_name);

    run(cli, cfg).instrument(root).await
}

async fn run(cli: Cli, cfg: AppConfig) -> Result<(), Box<dyn Error>> {
    let svc = Arc::new(LlmServiceProfiles::new(
        config_classifier_from_env()?,
        config_embedding_from_env()?,
    ));
    let (chat, embedding) = svc.profiles();
    info!(
        classifier = %chat.model,
        embedding = %embedding.model,
        "llm profiles loaded"
    );

    let enricher = CatalogEnricher::new(Arc::new(LlmStockClassifier::new(svc.clone())))
        .with_options(cfg.enrich);
    let builder = HybridRetrieverBuilder::new(cfg.retriever.clone(), Arc::new(LlmEmbedder::new(svc)));
    let bootstrapper = Bootstrapper::new(&cfg.catalog_path, enricher, builder);
    info!(catalog = %bootstrapper.catalog().display(), "starting catalog assistant");

    let registry = SessionRegistry::new();
    let ctx = registry.get_or_create(&cli.session).await;
    let mut ctx = ctx.lock().await;

    let summary = bootstrapper.initialize(&mut ctx).await?;
    println!(
        "{} {}",
        "session".bold(),
        summary.session_id.as_str().cyan()
    );
    match summary.enrichment {
        EnrichOutcome::Enriched(r) => println!(
            "{} {} rows ({} resumed, {} fallback labels)",
            "enriched".green(),
            r.rows,
            r.resumed,
            r.fallbacks
        ),
        EnrichOutcome::Skipped(reason) => {
            println!("{} {:?}", "enrichment skipped:".yellow(), reason)
        }
    }

    let Some(query) = cli.query else {
        return Ok(());
    };
    ctx.push_message(ChatMessage::new(Role::User, query.clone()));

    let Some(retriever) = ctx.retriever().cloned() else {
        return Err("session has no retriever after bootstrap".into());
    };
    let hits = retriever.retrieve(&query).await?;
    println!("{} {}", "query".bold(), query);
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{} {}",
            format!("#{} ({:.4})", i + 1, hit.score).dimmed(),
            hit.document.page_content.replace('\n', " | ")
        );
    }
    Ok(())
}
