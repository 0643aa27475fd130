//! Composite score: weighted blend of sentiment, valuation, quality and
//! technical signals, each normalized to [0, 1].

use analysis_core::numeric::{clip, clip01, finite, finite_or};
use analysis_core::{Recommendation, TechnicalSnapshot};
use fundamental_analysis::FundamentalSignals;
use serde::{Deserialize, Serialize};

const NEUTRAL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub sentiment: f64,
    pub fundamentals: f64,
    pub quality: f64,
    pub technical: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            sentiment: 0.25,
            fundamentals: 0.4,
            quality: 0.2,
            technical: 0.15,
        }
    }
}

impl ScoringWeights {
    /// Non-finite weights fall back to their defaults
    fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            sentiment: finite_or(self.sentiment, d.sentiment),
            fundamentals: finite_or(self.fundamentals, d.fundamentals),
            quality: finite_or(self.quality, d.quality),
            technical: finite_or(self.technical, d.technical),
        }
    }

    fn total(&self) -> f64 {
        let sum = self.sentiment + self.fundamentals + self.quality + self.technical;
        if sum == 0.0 {
            1.0
        } else {
            sum
        }
    }
}

/// Lower bounds of each bucket, checked from strongest to weakest.
/// Not validated for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub strong_buy: f64,
    pub buy: f64,
    pub hold: f64,
    pub sell: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            strong_buy: 0.78,
            buy: 0.62,
            hold: 0.48,
            sell: 0.35,
        }
    }
}

impl Thresholds {
    fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            strong_buy: finite_or(self.strong_buy, d.strong_buy),
            buy: finite_or(self.buy, d.buy),
            hold: finite_or(self.hold, d.hold),
            sell: finite_or(self.sell, d.sell),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub thresholds: Thresholds,
}

/// Normalized components and the blended result for one symbol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub sentiment_norm: f64,
    pub fundamentals_norm: f64,
    pub quality_norm: f64,
    pub technical_norm: f64,
    pub value_gap: f64,
    pub score: f64,
    pub confidence: f64,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    weights: ScoringWeights,
    thresholds: Thresholds,
}

impl CompositeScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            weights: config.weights.sanitized(),
            thresholds: config.thresholds.sanitized(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn score(
        &self,
        sentiment: Option<f64>,
        fundamentals: &FundamentalSignals,
        technicals: Option<&TechnicalSnapshot>,
    ) -> ScoreBreakdown {
        let sentiment = finite(sentiment);
        let value_gap = finite_or(fundamentals.value_gap, 0.0);

        let sentiment_norm = sentiment.map_or(NEUTRAL, |s| clip01(0.5 + 0.5 * s));
        let fundamentals_norm = clip01(0.5 + 0.5 * clip(value_gap, -1.0, 1.0, 0.0));
        let quality_norm = clip01(fundamentals.quality);
        let technical_norm = technicals.map_or(NEUTRAL, |t| clip01(t.technical_score));

        let w = &self.weights;
        let score = (w.sentiment * sentiment_norm
            + w.fundamentals * fundamentals_norm
            + w.quality * quality_norm
            + w.technical * technical_norm)
            / w.total();

        let confidence = clip01(
            0.35 + 0.35 * sentiment.unwrap_or(0.0).abs()
                + if fundamentals.has_fundamentals { 0.15 } else { 0.0 }
                + if technicals.is_some() { 0.15 } else { 0.0 },
        );

        ScoreBreakdown {
            sentiment_norm,
            fundamentals_norm,
            quality_norm,
            technical_norm,
            value_gap,
            score,
            confidence,
            recommendation: self.bucket(score),
        }
    }

    /// First bucket whose threshold `score` meets or exceeds, else Strong Sell
    pub fn bucket(&self, score: f64) -> Recommendation {
        let th = &self.thresholds;
        if score >= th.strong_buy {
            Recommendation::StrongBuy
        } else if score >= th.buy {
            Recommendation::Buy
        } else if score >= th.hold {
            Recommendation::Hold
        } else if score >= th.sell {
            Recommendation::Sell
        } else {
            Recommendation::StrongSell
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fundamentals(value_gap: f64, quality: f64, has: bool) -> FundamentalSignals {
        FundamentalSignals {
            value_gap,
            quality,
            has_fundamentals: has,
            ..FundamentalSignals::default()
        }
    }

    fn technicals(score: f64) -> TechnicalSnapshot {
        TechnicalSnapshot {
            last_close: 100.0,
            sma_fast: 100.0,
            sma_slow: 100.0,
            rsi: 50.0,
            technical_score: score,
            technical_bias: 0.0,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let scorer = CompositeScorer::default();
        let b = scorer.score(Some(0.6), &fundamentals(0.2, 0.7, true), Some(&technicals(0.8)));

        assert!((b.sentiment_norm - 0.8).abs() < 1e-12);
        assert!((b.fundamentals_norm - 0.6).abs() < 1e-12);
        assert!((b.score - 0.70).abs() < 1e-9);
        assert!((b.confidence - 0.86).abs() < 1e-9);
        assert_eq!(b.recommendation, Recommendation::Buy);
    }

    #[test]
    fn test_all_neutral() {
        let scorer = CompositeScorer::default();
        let b = scorer.score(None, &FundamentalSignals::default(), None);
        assert!((b.score - 0.5).abs() < 1e-12);
        assert!((b.confidence - 0.35).abs() < 1e-12);
        assert_eq!(b.recommendation, Recommendation::Hold);
    }

    #[test]
    fn test_value_gap_clipped_for_norm_but_reported_raw() {
        let scorer = CompositeScorer::default();
        let b = scorer.score(None, &fundamentals(1.8, 0.5, true), None);
        assert_eq!(b.fundamentals_norm, 1.0);
        assert_eq!(b.value_gap, 1.8);
    }

    #[test]
    fn test_malformed_inputs_are_neutral() {
        let scorer = CompositeScorer::default();
        let b = scorer.score(
            Some(f64::NAN),
            &fundamentals(f64::INFINITY, f64::NAN, false),
            Some(&technicals(f64::NAN)),
        );
        assert_eq!(b.sentiment_norm, 0.5);
        assert_eq!(b.fundamentals_norm, 0.5);
        assert_eq!(b.quality_norm, 0.5);
        assert_eq!(b.technical_norm, 0.5);
        assert!(b.score.is_finite());
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let scorer = CompositeScorer::new(ScoringConfig {
            weights: ScoringWeights {
                sentiment: f64::NAN,
                ..ScoringWeights::default()
            },
            thresholds: Thresholds {
                buy: f64::INFINITY,
                ..Thresholds::default()
            },
        });
        assert_eq!(scorer.weights(), &ScoringWeights::default());
        assert_eq!(scorer.thresholds(), &Thresholds::default());
    }

    #[test]
    fn test_zero_weights_do_not_divide_by_zero() {
        let scorer = CompositeScorer::new(ScoringConfig {
            weights: ScoringWeights {
                sentiment: 0.0,
                fundamentals: 0.0,
                quality: 0.0,
                technical: 0.0,
            },
            ..ScoringConfig::default()
        });
        let b = scorer.score(Some(1.0), &FundamentalSignals::default(), None);
        assert_eq!(b.score, 0.0);
        assert_eq!(b.recommendation, Recommendation::StrongSell);
    }

    #[test]
    fn test_bucket_boundaries() {
        let scorer = CompositeScorer::default();
        assert_eq!(scorer.bucket(0.78), Recommendation::StrongBuy);
        assert_eq!(scorer.bucket(0.7799), Recommendation::Buy);
        assert_eq!(scorer.bucket(0.62), Recommendation::Buy);
        assert_eq!(scorer.bucket(0.48), Recommendation::Hold);
        assert_eq!(scorer.bucket(0.35), Recommendation::Sell);
        assert_eq!(scorer.bucket(0.3499), Recommendation::StrongSell);
    }

    #[test]
    fn test_bucket_monotonic() {
        let scorer = CompositeScorer::default();
        let mut prev = Recommendation::StrongSell;
        for i in 0..=1000 {
            let rec = scorer.bucket(i as f64 / 1000.0);
            assert!(rec >= prev, "bucket decreased at {}", i);
            prev = rec;
        }
        assert_eq!(prev, Recommendation::StrongBuy);
    }

    #[test]
    fn test_confidence_bounded() {
        let scorer = CompositeScorer::default();
        let b = scorer.score(Some(1.0), &fundamentals(0.0, 0.5, true), Some(&technicals(0.5)));
        assert!((b.confidence - 1.0).abs() < 1e-12);
        let b = scorer.score(Some(-5.0), &fundamentals(0.0, 0.5, true), None);
        assert_eq!(b.confidence, 1.0);
    }
}
