//! intel-runner: one pass of the news-to-recommendations pipeline.
//!
//! Reads collector output from a JSON file, resolves mentioned companies,
//! scores the resulting universe and writes the ranked list under
//! `OUT_DIR/<date>/`.
//!
//! Usage:
//!   cargo run -p intel-runner
//!   NEWS_INPUT_PATH=today.json MAX_SYMBOLS=40 cargo run -p intel-runner

use analysis_core::RawArticle;
use analysis_orchestrator::{
    since_hours, AnalysisOrchestrator, CompositeScorer, IntelPipeline, UniverseSources,
};
use anyhow::{Context, Result};
use chrono::{Local, Utc};
use news_intake::{load_raw_articles, RegexEntityExtractor};
use sentiment_analysis::LexiconSentimentModel;
use sentiment_store::SentimentStore;
use std::path::Path;
use std::sync::Arc;
use symbol_resolver::{
    load_baseline_symbols, load_manual_aliases, load_symbol_master, load_watchlist, SymbolResolver,
};
use yahoo_client::YahooClient;

mod config;
mod output;

use config::PipelineConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    let config = PipelineConfig::from_env()?;

    let run_date = Local::now().date_naive();
    let since = since_hours(Utc::now(), config.lookback_hours);
    let out_dir = output::run_dir(&config.out_dir, run_date)?;
    tracing::info!("Run date={} since={} out={}", run_date, since, out_dir.display());

    // Registry and symbol lists
    let registry = load_symbol_master(&config.symbol_master_path, &config.default_market_suffix)?;
    let baseline = load_optional_list(&config.baseline_symbols_path, |p| load_baseline_symbols(p))?;
    let watchlist = load_optional_list(&config.watchlist_path, |p| load_watchlist(p))?;
    let aliases = load_manual_aliases(&config.manual_aliases_path);
    tracing::info!(
        "Registry: {} symbols, baseline: {}, watchlist: {}, manual aliases: {}",
        registry.len(),
        baseline.len(),
        watchlist.len(),
        aliases.len()
    );

    let raw_articles = load_articles(&config.news_input_path)?;

    // Components
    let resolver = SymbolResolver::new(&registry, &aliases, &config.resolver());
    prepare_state_dir(&config.state_db_url)?;
    let store = SentimentStore::connect(&config.state_db_url).await?;

    let yahoo = Arc::new(YahooClient::new(config.yahoo_rate_limit));
    let orchestrator = AnalysisOrchestrator::new(
        yahoo.clone(),
        yahoo,
        CompositeScorer::new(config.scoring()),
        config.orchestrator(),
    );

    let pipeline = IntelPipeline::new(
        UniverseSources {
            registry,
            baseline,
            watchlist,
        },
        resolver,
        Arc::new(RegexEntityExtractor::new()),
        Arc::new(LexiconSentimentModel::new()),
        store,
        orchestrator,
        config.pipeline(),
    );

    let report = pipeline.run(raw_articles, Some(since.as_str())).await?;

    output::write_recommendations(&out_dir.join("recommendations.csv"), &report.results)?;
    output::write_json(&out_dir.join("ranked.json"), &report.results)?;
    output::write_json(&out_dir.join("sector_boom.json"), &report.sector_boom)?;

    if let Some(top) = report.results.first() {
        tracing::info!("Top pick: {} ({}) {}", top.symbol, top.company, top.explanation);
    }
    tracing::info!(
        "Done. {} ranked symbols, {} sectors. Wrote outputs to {}",
        report.results.len(),
        report.sector_boom.len(),
        out_dir.display()
    );

    Ok(())
}

/// Missing list files are an empty list; present but unreadable ones are an error
fn load_optional_list<F>(path: &str, load: F) -> Result<Vec<String>>
where
    F: Fn(&Path) -> Result<Vec<String>>,
{
    let path = Path::new(path);
    if !path.exists() {
        tracing::warn!("{} not found, skipping", path.display());
        return Ok(Vec::new());
    }
    load(path)
}

/// A missing news file means a quiet day, not a failed run
fn load_articles(path: &str) -> Result<Vec<RawArticle>> {
    if !Path::new(path).exists() {
        tracing::warn!("No news input at {}, continuing without articles", path);
        return Ok(Vec::new());
    }
    load_raw_articles(path)
}

/// SQLite creates the file but not its directory
fn prepare_state_dir(database_url: &str) -> Result<()> {
    if database_url.contains(":memory:") {
        return Ok(());
    }
    let file = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let file = file.split('?').next().unwrap_or(file);

    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create state directory {}", parent.display()))?;
    }
    Ok(())
}
