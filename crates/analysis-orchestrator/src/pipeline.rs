//! End-to-end run: articles in, ranked symbols out.

use crate::sector::compute_sector_boom;
use crate::universe::{pick_universe, UniverseConfig};
use crate::AnalysisOrchestrator;
use analysis_core::{
    AnalysisResult, Article, EntityExtractor, RawArticle, ResolvedMatch, SentimentModel,
    SymbolRegistryEntry,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use news_intake::normalize_articles;
use sentiment_store::{ArticleSentiment, SentimentStore, DEFAULT_LINK_CONFIDENCE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use symbol_resolver::SymbolResolver;

/// Start of a lookback window, formatted the way the store compares timestamps
pub fn since_hours(now: DateTime<Utc>, hours: i64) -> String {
    (now - Duration::hours(hours.max(0))).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub universe: UniverseConfig,
    /// Article-symbol links below this confidence are ignored by aggregation
    pub min_link_confidence: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            universe: UniverseConfig::default(),
            min_link_confidence: 0.4,
        }
    }
}

/// Symbol lists the universe is drawn from besides the news
#[derive(Debug, Clone, Default)]
pub struct UniverseSources {
    pub registry: Vec<SymbolRegistryEntry>,
    pub baseline: Vec<String>,
    pub watchlist: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub articles: Vec<Article>,
    pub matches: Vec<ResolvedMatch>,
    pub universe: Vec<String>,
    pub symbol_sentiment: HashMap<String, f64>,
    pub results: Vec<AnalysisResult>,
    pub sector_boom: BTreeMap<String, f64>,
}

pub struct IntelPipeline {
    sources: UniverseSources,
    resolver: SymbolResolver,
    extractor: Arc<dyn EntityExtractor>,
    sentiment_model: Arc<dyn SentimentModel>,
    store: SentimentStore,
    orchestrator: AnalysisOrchestrator,
    settings: PipelineSettings,
}

impl IntelPipeline {
    pub fn new(
        sources: UniverseSources,
        resolver: SymbolResolver,
        extractor: Arc<dyn EntityExtractor>,
        sentiment_model: Arc<dyn SentimentModel>,
        store: SentimentStore,
        orchestrator: AnalysisOrchestrator,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            sources,
            resolver,
            extractor,
            sentiment_model,
            store,
            orchestrator,
            settings,
        }
    }

    pub fn store(&self) -> &SentimentStore {
        &self.store
    }

    /// Run once over a batch of collector records.
    ///
    /// `since` bounds which articles count toward symbol sentiment; `None`
    /// disables the recency filter.
    pub async fn run(&self, raw_articles: Vec<RawArticle>, since: Option<&str>) -> Result<PipelineOutput> {
        let raw_count = raw_articles.len();
        let articles = normalize_articles(raw_articles);
        tracing::info!("Collected {} articles ({} after dedup)", raw_count, articles.len());

        let entities = self.extractor.extract(&articles);
        let matches = self.resolver.map_entities(&entities);
        let news_symbols: Vec<String> = matches.iter().map(|m| m.symbol.clone()).collect();
        tracing::info!(
            "News-driven symbols: {} (from {} entities)",
            news_symbols.len(),
            entities.len()
        );

        let universe = pick_universe(
            &news_symbols,
            &self.sources.baseline,
            &self.sources.watchlist,
            &self.settings.universe,
        );
        tracing::info!("Final analysis universe: {} symbols", universe.len());

        self.persist(&articles, &matches).await?;

        let symbol_sentiment = self
            .store
            .aggregate_symbol_sentiment(since, self.settings.min_link_confidence)
            .await;

        let results = self
            .orchestrator
            .run(&universe, &self.sources.registry, &symbol_sentiment)
            .await;
        let sector_boom = compute_sector_boom(&results);

        Ok(PipelineOutput {
            articles,
            matches,
            universe,
            symbol_sentiment,
            results,
            sector_boom,
        })
    }

    /// Store articles, their sentiment, and links to every symbol matched in this run
    async fn persist(&self, articles: &[Article], matches: &[ResolvedMatch]) -> Result<()> {
        self.store
            .upsert_articles(articles)
            .await
            .context("Failed to store articles")?;

        let model = self.sentiment_model.name().to_string();
        let sentiments: Vec<ArticleSentiment> = articles
            .iter()
            .map(|a| {
                let (sentiment, confidence) = self.sentiment_model.score(&a.text());
                ArticleSentiment {
                    digest: a.digest.clone(),
                    sentiment,
                    confidence,
                    model: model.clone(),
                }
            })
            .collect();
        self.store
            .save_article_sentiments(&sentiments)
            .await
            .context("Failed to store article sentiment")?;

        let links: Vec<(String, f64)> = matches
            .iter()
            .map(|m| (m.symbol.clone(), (m.score / 100.0).min(1.0)))
            .collect();
        if !links.is_empty() {
            for article in articles {
                self.store
                    .save_article_symbols(&article.digest, &links, DEFAULT_LINK_CONFIDENCE)
                    .await
                    .with_context(|| format!("Failed to link symbols for article {}", article.digest))?;
            }
        }

        tracing::info!(
            "Stored {} articles with {} symbol links each",
            articles.len(),
            links.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompositeScorer, OrchestratorConfig};
    use analysis_core::{AnalysisError, Bar, FundamentalsProvider, FundamentalsSnapshot, MarketDataProvider};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use news_intake::RegexEntityExtractor;
    use sentiment_analysis::LexiconSentimentModel;
    use symbol_resolver::ResolverConfig;

    struct FlatMarket;

    #[async_trait]
    impl MarketDataProvider for FlatMarket {
        async fn history(&self, _market_id: &str, _days: u32) -> Result<Vec<Bar>, AnalysisError> {
            let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
            Ok((0..30)
                .map(|i| Bar {
                    timestamp: t0 + Duration::days(i),
                    open: 100.0,
                    high: 100.0,
                    low: 100.0,
                    close: 100.0,
                    volume: 10.0,
                })
                .collect())
        }
    }

    struct NoFundamentals;

    #[async_trait]
    impl FundamentalsProvider for NoFundamentals {
        async fn fundamentals(&self, _market_id: &str) -> Result<FundamentalsSnapshot, AnalysisError> {
            Ok(FundamentalsSnapshot::default())
        }
    }

    fn registry() -> Vec<SymbolRegistryEntry> {
        vec![
            SymbolRegistryEntry {
                symbol: "ABC".to_string(),
                name: "Alpha Beta Corp".to_string(),
                sector: "IT".to_string(),
                market_id: "ABC.NS".to_string(),
                aliases: vec!["ABC Ltd".to_string()],
            },
            SymbolRegistryEntry {
                symbol: "XYZ".to_string(),
                name: "Xylo Zeta Industries".to_string(),
                sector: "Energy".to_string(),
                market_id: "XYZ.NS".to_string(),
                aliases: vec![],
            },
            SymbolRegistryEntry {
                symbol: "QRS".to_string(),
                name: "Quartz Rail Systems".to_string(),
                sector: "".to_string(),
                market_id: "QRS.NS".to_string(),
                aliases: vec![],
            },
        ]
    }

    async fn pipeline(baseline: Vec<String>, watchlist: Vec<String>) -> IntelPipeline {
        let registry = registry();
        let resolver = SymbolResolver::new(&registry, &HashMap::new(), &ResolverConfig::default());
        let store = SentimentStore::connect("sqlite::memory:").await.unwrap();
        let orchestrator = AnalysisOrchestrator::new(
            Arc::new(FlatMarket),
            Arc::new(NoFundamentals),
            CompositeScorer::default(),
            OrchestratorConfig::default(),
        );

        IntelPipeline::new(
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
            PipelineSettings::default(),
        )
    }

    fn raw(title: &str, url: &str, published: &str) -> RawArticle {
        RawArticle {
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            source: Some("wire".to_string()),
            published_at: Some(published.to_string()),
            summary: None,
        }
    }

    #[test]
    fn test_since_hours() {
        let now = Utc.with_ymd_and_hms(2025, 1, 4, 12, 0, 0).unwrap();
        assert_eq!(since_hours(now, 72), "2025-01-01T12:00:00Z");
        assert_eq!(since_hours(now, -5), "2025-01-04T12:00:00Z");
    }

    #[tokio::test]
    async fn test_full_run() {
        let p = pipeline(vec!["QRS".to_string()], vec!["abc".to_string(), "ZZZ".to_string()]).await;

        let output = p
            .run(
                vec![
                    raw("Alpha Beta Corp shares surge on record profit", "https://n/1", "2025-01-05T10:00:00Z"),
                    raw("ALPHA BETA CORP shares surge on record profit", "HTTPS://N/1", "2025-01-05T10:00:00Z"),
                    raw("Xylo Zeta Industries posts strong growth", "https://n/2", ""),
                ],
                Some("2025-01-01T00:00:00Z"),
            )
            .await
            .unwrap();

        assert_eq!(output.articles.len(), 2);

        let matched: Vec<&str> = output.matches.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(matched, vec!["ABC", "XYZ"]);
        assert!(output.matches.iter().all(|m| m.score == 100.0));

        assert_eq!(output.universe, vec!["ABC", "XYZ", "QRS", "ZZZ"]);

        // Every article links to every matched symbol, so both see the same average
        assert_eq!(output.symbol_sentiment.len(), 2);
        let abc = output.symbol_sentiment["ABC"];
        assert!(abc > 0.0);
        assert!((abc - output.symbol_sentiment["XYZ"]).abs() < 1e-12);

        assert_eq!(output.results.len(), 4);
        assert_eq!(output.results[0].symbol, "ABC");
        assert_eq!(output.results[1].symbol, "XYZ");
        assert_eq!(output.results[2].symbol, "QRS");
        assert_eq!(output.results[2].sector, "");
        assert_eq!(output.results[3].sector, "Unknown");

        assert_eq!(output.sector_boom.len(), 2);
        assert!((output.sector_boom["IT"] - abc).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_recency_window_excludes_old_news() {
        let p = pipeline(vec![], vec![]).await;

        let output = p
            .run(
                vec![raw("Alpha Beta Corp shares surge", "https://n/old", "2020-01-01T00:00:00Z")],
                Some("2025-01-01T00:00:00Z"),
            )
            .await
            .unwrap();

        assert_eq!(output.universe, vec!["ABC"]);
        assert!(output.symbol_sentiment.is_empty());
        assert_eq!(output.results[0].sentiment, None);
    }

    #[tokio::test]
    async fn test_date_only_article_outside_window_is_excluded() {
        let p = pipeline(vec![], vec![]).await;

        let output = p
            .run(
                vec![raw("Alpha Beta Corp shares surge", "https://n/old", "2020-01-01")],
                Some("2025-01-01T00:00:00Z"),
            )
            .await
            .unwrap();

        assert_eq!(output.articles[0].published_at, "2020-01-01T00:00:00Z");
        assert!(output.symbol_sentiment.is_empty());
        assert_eq!(output.results[0].sentiment, None);
    }

    #[tokio::test]
    async fn test_no_articles_no_symbols() {
        let p = pipeline(vec![], vec![]).await;
        let output = p.run(vec![], None).await.unwrap();

        assert!(output.articles.is_empty());
        assert!(output.universe.is_empty());
        assert!(output.results.is_empty());
        assert!(output.sector_boom.is_empty());
    }

    #[tokio::test]
    async fn test_reruns_are_idempotent() {
        let p = pipeline(vec![], vec![]).await;
        let batch = || vec![raw("Xylo Zeta Industries posts strong growth", "https://n/2", "")];

        let first = p.run(batch(), None).await.unwrap();
        let second = p.run(batch(), None).await.unwrap();
        assert_eq!(first.symbol_sentiment, second.symbol_sentiment);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(p.store().pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
