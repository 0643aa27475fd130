use async_trait::async_trait;
use crate::{AnalysisError, Article, Bar, FundamentalsSnapshot};

/// Source of daily price history for a market identifier
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Time-ordered daily bars covering roughly the last `days` days.
    /// An unknown identifier yields an empty vector, not an error.
    async fn history(&self, market_id: &str, days: u32) -> Result<Vec<Bar>, AnalysisError>;
}

/// Source of valuation/profitability data for a market identifier
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn fundamentals(&self, market_id: &str) -> Result<FundamentalsSnapshot, AnalysisError>;
}

/// Pulls candidate entity strings (company names, tickers) out of article text
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, articles: &[Article]) -> Vec<String>;
}

/// Scores free text; returns `(sentiment in [-1, 1], confidence in [0, 1])`
pub trait SentimentModel: Send + Sync {
    fn name(&self) -> &str;
    fn score(&self, text: &str) -> (f64, f64);
}
