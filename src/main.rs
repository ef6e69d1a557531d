//! news-enricher: binary entrypoint.
//! `sync` pulls provider news into the store, `analyze` enriches pending records,
//! `run` does both. Meant to be invoked by an external scheduler, one run at a time.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use market_news_enricher::analyze::article::{ArticleFetcher, ArticleSource};
use market_news_enricher::ingest::finnhub::FinnhubFetcher;
use market_news_enricher::{build_enricher, run_enrichment, run_sync, EnrichOptions, Settings};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "news-enricher", version, about = "Market news store with AI enrichment")]
struct Cli {
    /// TOML config file (defaults to $NEWS_CONFIG_PATH, then config/news.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch latest provider news and merge it into the store.
    Sync,
    /// Enrich records that lack an analysis or carry an older schema version.
    Analyze,
    /// `sync` followed by `analyze`.
    Run,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn sync(cfg: &Settings) -> anyhow::Result<()> {
    let fetcher = FinnhubFetcher::new(&cfg.fetch).context("building news provider client")?;
    let store = cfg.news_store();
    let now = chrono::Utc::now().timestamp();

    let report = run_sync(&fetcher, &store, &cfg.retention_policy(), now).await?;
    if let Some(e) = &report.fetch_error {
        error!(target: "ingest", error = %e, "news fetch failed; store left unchanged");
    }
    Ok(())
}

async fn analyze(cfg: &Settings) -> anyhow::Result<()> {
    let enricher = build_enricher(&cfg.analyze).context("building AI client")?;
    info!(
        target: "analyze",
        provider = enricher.name(),
        model = cfg.analyze.model(),
        version = cfg.analyze.schema_version,
        "AI configured"
    );

    let articles = if cfg.analyze.fetch_article_text {
        Some(ArticleFetcher::new(
            Duration::from_secs(cfg.analyze.article_timeout_secs),
            cfg.analyze.article_char_budget,
        )?)
    } else {
        None
    };

    let store = cfg.news_store();
    let opts = EnrichOptions::from(&cfg.analyze);
    let report = run_enrichment(
        &store,
        enricher.as_ref(),
        articles.as_ref().map(|a| a as &dyn ArticleSource),
        &opts,
    )
    .await?;

    info!(
        target: "analyze",
        eligible = report.eligible,
        selected = report.selected,
        enriched = report.enriched,
        failed = report.failed,
        "all done"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json);

    let cfg = Settings::load(cli.config.as_deref())?;
    info!(path = %cfg.store.path.display(), "store configured");

    match cli.command {
        Command::Sync => sync(&cfg).await,
        Command::Analyze => analyze(&cfg).await,
        Command::Run => {
            sync(&cfg).await?;
            analyze(&cfg).await
        }
    }
}
