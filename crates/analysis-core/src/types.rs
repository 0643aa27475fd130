use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Article record as handed over by a news collector. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, alias = "published")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Normalized news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable identity derived from the normalized (source, title, url) triple
    pub digest: String,
    pub title: String,
    pub url: String,
    pub source: String,
    /// RFC 3339 UTC timestamp, or empty when the collector's date was unusable
    pub published_at: String,
    pub summary: String,
}

impl Article {
    /// Text the sentiment model and entity extractor look at
    pub fn text(&self) -> String {
        format!("{}\n{}", self.title, self.summary).trim().to_string()
    }
}

/// One row of the symbol master
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRegistryEntry {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    /// Provider-specific ticker, e.g. `RELIANCE.NS`
    pub market_id: String,
    pub aliases: Vec<String>,
}

/// A free-text entity resolved to a canonical symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMatch {
    pub symbol: String,
    /// Similarity, 0 to 100
    pub score: f64,
    pub matched_text: String,
}

/// Valuation inputs reported by a fundamentals provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    pub forward_pe: Option<f64>,
    pub trailing_pe: Option<f64>,
    /// Fraction, e.g. 0.18 for 18%
    pub return_on_equity: Option<f64>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// Trend/momentum summary computed from daily bars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub last_close: f64,
    pub sma_fast: f64,
    pub sma_slow: f64,
    pub rsi: f64,
    /// 0.0 to 1.0
    pub technical_score: f64,
    /// -1.0, 0.0 or 1.0
    pub technical_bias: f64,
}

/// Discrete recommendation bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Strong Sell")]
    StrongSell,
    #[serde(rename = "Sell")]
    Sell,
    #[serde(rename = "Hold / Neutral")]
    Hold,
    #[serde(rename = "Buy")]
    Buy,
    #[serde(rename = "Strong Buy")]
    StrongBuy,
}

impl Recommendation {
    /// Human-readable label for the bucket
    pub fn to_label(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "Strong Buy",
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold / Neutral",
            Recommendation::Sell => "Sell",
            Recommendation::StrongSell => "Strong Sell",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_label())
    }
}

/// Per-symbol output of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub company: String,
    pub sector: String,
    pub market_id: String,
    pub price: Option<f64>,
    pub target_range_low: Option<f64>,
    pub target_range_high: Option<f64>,
    pub sentiment: Option<f64>,
    pub sentiment_norm: f64,
    pub fundamentals_norm: f64,
    pub quality_norm: f64,
    pub technical_norm: f64,
    pub value_gap: f64,
    pub score: f64,
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_labels_and_order() {
        assert_eq!(Recommendation::Hold.to_label(), "Hold / Neutral");
        assert_eq!(Recommendation::StrongBuy.to_string(), "Strong Buy");
        assert!(Recommendation::StrongBuy > Recommendation::Buy);
        assert!(Recommendation::Sell > Recommendation::StrongSell);
    }

    #[test]
    fn test_raw_article_missing_fields() {
        let raw: RawArticle = serde_json::from_str(r#"{"title": "Hello", "published": "2025-01-01"}"#).unwrap();
        assert_eq!(raw.title.as_deref(), Some("Hello"));
        assert_eq!(raw.published_at.as_deref(), Some("2025-01-01"));
        assert!(raw.url.is_none());
    }

    #[test]
    fn test_recommendation_serializes_as_label() {
        let json = serde_json::to_string(&Recommendation::Hold).unwrap();
        assert_eq!(json, "\"Hold / Neutral\"");
    }
}
