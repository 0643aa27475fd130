use analysis_core::numeric::clip01;
use analysis_core::{Bar, TechnicalSnapshot};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

/// Scores at or above this are a bullish bias
const BULLISH_SCORE: f64 = 0.62;
/// Scores at or below this are a bearish bias
const BEARISH_SCORE: f64 = 0.38;
const NEUTRAL_RSI: f64 = 50.0;

/// Indicator lookbacks, in bars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalsConfig {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub rsi_period: usize,
}

impl Default for TechnicalsConfig {
    fn default() -> Self {
        Self {
            sma_fast: 20,
            sma_slow: 50,
            rsi_period: 14,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TechnicalAnalysisEngine {
    config: TechnicalsConfig,
}

impl TechnicalAnalysisEngine {
    pub fn new(config: TechnicalsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TechnicalsConfig {
        &self.config
    }

    /// Trend and momentum summary of the latest bar; `None` without usable closes.
    ///
    /// Moving averages that need more history than is available fall back to
    /// the last close, and an undefined RSI reads as 50.
    pub fn analyze(&self, bars: &[Bar]) -> Option<TechnicalSnapshot> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).filter(|c| c.is_finite()).collect();
        let last_close = *closes.last()?;

        let latest = |series: Vec<f64>, fallback: f64| {
            series.last().copied().filter(|v| v.is_finite()).unwrap_or(fallback)
        };

        let sma_fast = latest(sma(&closes, self.config.sma_fast), last_close);
        let sma_slow = latest(sma(&closes, self.config.sma_slow), last_close);
        let rsi = latest(rsi(&closes, self.config.rsi_period), NEUTRAL_RSI);

        let trend = if sma_fast > sma_slow {
            1.0
        } else if sma_fast < sma_slow {
            -1.0
        } else {
            0.0
        };

        let momentum = if sma_slow != 0.0 { last_close / sma_slow - 1.0 } else { 0.0 };

        let technical_score = clip01(0.5 + 0.25 * trend + 0.25 * (5.0 * momentum).tanh());
        let technical_bias = if technical_score >= BULLISH_SCORE {
            1.0
        } else if technical_score <= BEARISH_SCORE {
            -1.0
        } else {
            0.0
        };

        tracing::debug!(
            "Technicals: close={:.2} sma_fast={:.2} sma_slow={:.2} rsi={:.1} score={:.3}",
            last_close,
            sma_fast,
            sma_slow,
            rsi,
            technical_score
        );

        Some(TechnicalSnapshot {
            last_close,
            sma_fast,
            sma_slow,
            rsi,
            technical_score,
            technical_bias,
        })
    }
}

/// [`TechnicalAnalysisEngine::analyze`] with the given lookbacks
pub fn compute_technicals(bars: &[Bar], config: &TechnicalsConfig) -> Option<TechnicalSnapshot> {
    TechnicalAnalysisEngine::new(*config).analyze(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars_from(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    #[test]
    fn test_empty_bars() {
        assert!(compute_technicals(&[], &TechnicalsConfig::default()).is_none());
    }

    #[test]
    fn test_single_bar_falls_back() {
        let snap = compute_technicals(&bars_from(&[100.0]), &TechnicalsConfig::default()).unwrap();
        assert_eq!(snap.last_close, 100.0);
        assert_eq!(snap.sma_fast, 100.0);
        assert_eq!(snap.sma_slow, 100.0);
        assert_eq!(snap.rsi, 50.0);
        assert_eq!(snap.technical_score, 0.5);
        assert_eq!(snap.technical_bias, 0.0);
    }

    #[test]
    fn test_uptrend_is_bullish() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let snap = compute_technicals(&bars_from(&closes), &TechnicalsConfig::default()).unwrap();

        assert!(snap.sma_fast > snap.sma_slow);
        assert!(snap.technical_score >= 0.62);
        assert_eq!(snap.technical_bias, 1.0);
        // No losses at all, so RS is undefined
        assert_eq!(snap.rsi, 50.0);
    }

    #[test]
    fn test_downtrend_is_bearish() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let snap = compute_technicals(&bars_from(&closes), &TechnicalsConfig::default()).unwrap();

        assert!(snap.sma_fast < snap.sma_slow);
        assert!(snap.technical_score <= 0.38);
        assert_eq!(snap.technical_bias, -1.0);
        assert!(snap.rsi < 1e-9);
    }

    #[test]
    fn test_score_formula() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let snap = compute_technicals(&bars_from(&closes), &TechnicalsConfig::default()).unwrap();

        // SMA(50) over 110..=159 is 134.5
        assert!((snap.sma_slow - 134.5).abs() < 1e-9);
        let momentum: f64 = 159.0 / 134.5 - 1.0;
        let expected = (0.5 + 0.25 + 0.25 * (5.0 * momentum).tanh()).min(1.0);
        assert!((snap.technical_score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_closes_ignored() {
        let snap = compute_technicals(&bars_from(&[10.0, f64::NAN, 12.0]), &TechnicalsConfig::default()).unwrap();
        assert_eq!(snap.last_close, 12.0);

        assert!(compute_technicals(&bars_from(&[f64::NAN]), &TechnicalsConfig::default()).is_none());
    }

    #[test]
    fn test_score_bounded_and_bias_consistent() {
        let config = TechnicalsConfig {
            sma_fast: 3,
            sma_slow: 5,
            rsi_period: 3,
        };
        let series = [
            vec![1.0, 50.0, 1.0, 50.0, 1.0, 50.0],
            vec![10.0, 10.0, 10.0, 10.0, 10.0, 10.0],
            vec![100.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 100.0],
        ];
        for closes in series {
            let snap = compute_technicals(&bars_from(&closes), &config).unwrap();
            assert!((0.0..=1.0).contains(&snap.technical_score));
            let expected_bias = if snap.technical_score >= 0.62 {
                1.0
            } else if snap.technical_score <= 0.38 {
                -1.0
            } else {
                0.0
            };
            assert_eq!(snap.technical_bias, expected_bias);
            assert!((0.0..=100.0).contains(&snap.rsi));
        }
    }
}
