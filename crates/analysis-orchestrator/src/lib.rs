use analysis_core::numeric::clip;
use analysis_core::{
    AnalysisError, AnalysisResult, FundamentalsProvider, MarketDataProvider, SymbolRegistryEntry,
    TechnicalSnapshot,
};
use fundamental_analysis::FundamentalAnalysisEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use technical_analysis::{TechnicalAnalysisEngine, TechnicalsConfig};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub mod pipeline;
pub mod scorer;
pub mod sector;
pub mod universe;

pub use pipeline::{since_hours, IntelPipeline, PipelineOutput, PipelineSettings, UniverseSources};
pub use scorer::{CompositeScorer, ScoreBreakdown, ScoringConfig, ScoringWeights, Thresholds};
pub use sector::compute_sector_boom;
pub use universe::{pick_universe, UniverseConfig};

const UNKNOWN_SECTOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Days of daily history requested per symbol
    pub history_days: u32,
    /// Upper bound on symbols analyzed at once; values below 1 act as 1
    pub max_concurrency: usize,
    /// Appended to symbols missing from the registry to form a market id
    pub default_market_suffix: String,
    pub technicals: TechnicalsConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_days: 550,
            max_concurrency: 6,
            default_market_suffix: ".NS".to_string(),
            technicals: TechnicalsConfig::default(),
        }
    }
}

/// Fans per-symbol analysis out over a bounded pool and ranks the results
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    market_data: Arc<dyn MarketDataProvider>,
    fundamentals: Arc<dyn FundamentalsProvider>,
    scorer: Arc<CompositeScorer>,
    technical_analyzer: Arc<TechnicalAnalysisEngine>,
    fundamental_analyzer: Arc<FundamentalAnalysisEngine>,
    config: Arc<OrchestratorConfig>,
}

impl AnalysisOrchestrator {
    pub fn new(
        market_data: Arc<dyn MarketDataProvider>,
        fundamentals: Arc<dyn FundamentalsProvider>,
        scorer: CompositeScorer,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            market_data,
            fundamentals,
            scorer: Arc::new(scorer),
            technical_analyzer: Arc::new(TechnicalAnalysisEngine::new(config.technicals)),
            fundamental_analyzer: Arc::new(FundamentalAnalysisEngine::new()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Market id for a symbol: the registry's, else `<SYMBOL><default suffix>`
    pub fn market_id_for(&self, symbol: &str, entry: Option<&SymbolRegistryEntry>) -> String {
        entry
            .map(|e| e.market_id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", symbol, self.config.default_market_suffix))
    }

    /// Analyze one symbol. Collaborator failures are returned, not swallowed.
    pub async fn analyze_symbol(
        &self,
        symbol: &str,
        entry: Option<&SymbolRegistryEntry>,
        sentiment: Option<f64>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let market_id = self.market_id_for(symbol, entry);

        let bars = self.market_data.history(&market_id, self.config.history_days).await?;
        let technicals = self.technical_analyzer.analyze(&bars);

        let snapshot = self.fundamentals.fundamentals(&market_id).await?;
        let fundamentals = self.fundamental_analyzer.analyze(&snapshot);

        let breakdown = self.scorer.score(sentiment, &fundamentals, technicals.as_ref());

        let price = technicals.map(|t| t.last_close);
        let (target_range_low, target_range_high) = match price {
            Some(p) => {
                let (low, high) = target_range(p, breakdown.value_gap);
                (Some(low), Some(high))
            }
            None => (None, None),
        };

        let explanation = explain(&breakdown, sentiment, fundamentals.value_gap, technicals.as_ref());

        let (company, sector) = match entry {
            Some(e) if !e.name.trim().is_empty() => (e.name.clone(), e.sector.clone()),
            Some(e) => (symbol.to_string(), e.sector.clone()),
            None => (symbol.to_string(), UNKNOWN_SECTOR.to_string()),
        };

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            company,
            sector,
            market_id,
            price,
            target_range_low,
            target_range_high,
            sentiment,
            sentiment_norm: breakdown.sentiment_norm,
            fundamentals_norm: breakdown.fundamentals_norm,
            quality_norm: breakdown.quality_norm,
            technical_norm: breakdown.technical_norm,
            value_gap: breakdown.value_gap,
            score: breakdown.score,
            confidence: breakdown.confidence,
            recommendation: breakdown.recommendation,
            explanation,
        })
    }

    /// Analyze every symbol of the universe and rank by score, descending.
    ///
    /// Symbols whose analysis fails (or whose task panics) are logged and
    /// left out. Equal scores keep universe order.
    pub async fn run(
        &self,
        universe: &[String],
        registry: &[SymbolRegistryEntry],
        symbol_sentiment: &HashMap<String, f64>,
    ) -> Vec<AnalysisResult> {
        let mut by_symbol: HashMap<String, SymbolRegistryEntry> = HashMap::new();
        for entry in registry {
            by_symbol.entry(entry.symbol.to_uppercase()).or_insert_with(|| entry.clone());
        }
        let by_symbol = Arc::new(by_symbol);
        let sentiment = Arc::new(symbol_sentiment.clone());

        let concurrency = self.config.max_concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));

        tracing::info!(
            "Analyzing {} symbols with concurrency {}",
            universe.len(),
            concurrency
        );

        let mut tasks = JoinSet::new();

        for (idx, symbol) in universe.iter().enumerate() {
            let orchestrator = self.clone();
            let by_symbol = Arc::clone(&by_symbol);
            let sentiment = Arc::clone(&sentiment);
            let semaphore = Arc::clone(&semaphore);
            let symbol = symbol.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return (idx, symbol, Err(AnalysisError::ApiError("worker pool closed".to_string())));
                };
                let entry = by_symbol.get(&symbol);
                let sent = sentiment.get(&symbol).copied();
                let result = orchestrator.analyze_symbol(&symbol, entry, sent).await;
                (idx, symbol, result)
            });
        }

        let mut collected: Vec<(usize, AnalysisResult)> = Vec::with_capacity(universe.len());
        let mut failed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, _symbol, Ok(result))) => collected.push((idx, result)),
                Ok((_, symbol, Err(e))) => {
                    failed += 1;
                    tracing::warn!("Skipping {}: {}", symbol, e);
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("Analysis task panicked: {}", e);
                }
            }
        }

        // Completion order is arbitrary; restore universe order before the stable sort
        collected.sort_by_key(|(idx, _)| *idx);
        let mut results: Vec<AnalysisResult> = collected.into_iter().map(|(_, r)| r).collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::info!("Ranked {} symbols ({} skipped)", results.len(), failed);
        results
    }
}

/// Indicative price band around the value-gap-implied fair price
pub fn target_range(price: f64, value_gap: f64) -> (f64, f64) {
    let base = price * (1.0 + clip(value_gap, -0.5, 1.5, 0.0));
    (base * 0.85, base * 1.15)
}

fn explain(
    breakdown: &ScoreBreakdown,
    sentiment: Option<f64>,
    value_gap: f64,
    technicals: Option<&TechnicalSnapshot>,
) -> String {
    let sent = match sentiment {
        Some(s) => format!("{:+.2}", s),
        None => "NA".to_string(),
    };
    let tech = technicals.map_or(0.5, |t| t.technical_score);

    format!(
        "Score={:.2} ({}); Sent={}; ValueGap={:+.1}; Tech={:.2}",
        breakdown.score, breakdown.recommendation, sent, value_gap, tech
    )
}
