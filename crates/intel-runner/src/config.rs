use analysis_orchestrator::{
    OrchestratorConfig, PipelineSettings, ScoringConfig, ScoringWeights, Thresholds, UniverseConfig,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use symbol_resolver::ResolverConfig;
use technical_analysis::TechnicalsConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    // Inputs
    pub symbol_master_path: String,
    pub baseline_symbols_path: String,
    pub watchlist_path: String,
    pub manual_aliases_path: String,
    pub news_input_path: String,

    // State and output
    pub state_db_url: String,
    pub out_dir: String,

    // Universe
    pub lookback_hours: i64,
    pub max_symbols: usize,
    pub include_baseline: bool,
    pub include_watchlist: bool,

    // Resolution
    pub min_match_score: f64,
    pub min_link_confidence: f64,

    // Analysis
    pub max_concurrency: usize,
    pub history_days: u32,
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub rsi_period: usize,
    pub default_market_suffix: String,
    pub weights: ScoringWeights,
    pub thresholds: Thresholds,

    // Market data
    pub yahoo_rate_limit: usize,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values are logged and replaced
    /// by their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let weight_defaults = ScoringWeights::default();
        let threshold_defaults = Thresholds::default();

        let config = Self {
            symbol_master_path: text("SYMBOL_MASTER_PATH", "data/symbol_master.csv"),
            baseline_symbols_path: text("BASELINE_SYMBOLS_PATH", "data/baseline_symbols.csv"),
            watchlist_path: text("WATCHLIST_PATH", "data/watchlist.txt"),
            manual_aliases_path: text("MANUAL_ALIASES_PATH", "data/manual_aliases.csv"),
            news_input_path: text("NEWS_INPUT_PATH", "data/articles.json"),

            state_db_url: text("STATE_DB_URL", "sqlite:.cache/state.db"),
            out_dir: text("OUT_DIR", "artifacts"),

            lookback_hours: parse_or(&lookup, "LOOKBACK_HOURS", 72),
            max_symbols: parse_or(&lookup, "MAX_SYMBOLS", 120),
            include_baseline: flag_or(&lookup, "INCLUDE_BASELINE", true),
            include_watchlist: flag_or(&lookup, "INCLUDE_WATCHLIST", true),

            min_match_score: parse_or(&lookup, "MIN_MATCH_SCORE", 80.0),
            min_link_confidence: parse_or(&lookup, "MIN_LINK_CONFIDENCE", 0.4),

            max_concurrency: parse_or(&lookup, "MAX_CONCURRENCY", 6),
            history_days: parse_or(&lookup, "HISTORY_DAYS", 550),
            sma_fast: parse_or(&lookup, "SMA_FAST", 20),
            sma_slow: parse_or(&lookup, "SMA_SLOW", 50),
            rsi_period: parse_or(&lookup, "RSI_PERIOD", 14),
            default_market_suffix: text("DEFAULT_MARKET_SUFFIX", ".NS"),
            weights: ScoringWeights {
                sentiment: parse_or(&lookup, "WEIGHT_SENTIMENT", weight_defaults.sentiment),
                fundamentals: parse_or(&lookup, "WEIGHT_FUNDAMENTALS", weight_defaults.fundamentals),
                quality: parse_or(&lookup, "WEIGHT_QUALITY", weight_defaults.quality),
                technical: parse_or(&lookup, "WEIGHT_TECHNICAL", weight_defaults.technical),
            },
            thresholds: Thresholds {
                strong_buy: parse_or(&lookup, "THRESHOLD_STRONG_BUY", threshold_defaults.strong_buy),
                buy: parse_or(&lookup, "THRESHOLD_BUY", threshold_defaults.buy),
                hold: parse_or(&lookup, "THRESHOLD_HOLD", threshold_defaults.hold),
                sell: parse_or(&lookup, "THRESHOLD_SELL", threshold_defaults.sell),
            },

            yahoo_rate_limit: parse_or(&lookup, "YAHOO_RATE_LIMIT", 120),
        };

        Ok(config.sanitized())
    }

    /// Replace values no run can work with by their defaults, with a warning
    fn sanitized(mut self) -> Self {
        if self.max_symbols == 0 {
            tracing::warn!("MAX_SYMBOLS must be at least 1, using default 120");
            self.max_symbols = 120;
        }
        if self.lookback_hours < 0 {
            tracing::warn!("LOOKBACK_HOURS must not be negative, got {}, using default 72", self.lookback_hours);
            self.lookback_hours = 72;
        }
        let technicals = TechnicalsConfig::default();
        for (key, value, default) in [
            ("SMA_FAST", &mut self.sma_fast, technicals.sma_fast),
            ("SMA_SLOW", &mut self.sma_slow, technicals.sma_slow),
            ("RSI_PERIOD", &mut self.rsi_period, technicals.rsi_period),
        ] {
            if *value == 0 {
                tracing::warn!("{} must be at least 1, using default {}", key, default);
                *value = default;
            }
        }
        for (key, value, default) in [
            ("MIN_MATCH_SCORE", &mut self.min_match_score, 80.0),
            ("MIN_LINK_CONFIDENCE", &mut self.min_link_confidence, 0.4),
        ] {
            if !value.is_finite() {
                tracing::warn!("{} must be a finite number, using default {}", key, default);
                *value = default;
            }
        }
        self
    }

    /// Exchange suffixes stripped before indexing, including the configured default
    pub fn resolver(&self) -> ResolverConfig {
        let mut config = ResolverConfig {
            min_score: self.min_match_score,
            ..ResolverConfig::default()
        };
        let suffix = self.default_market_suffix.trim();
        if !suffix.is_empty()
            && !config
                .market_suffixes
                .iter()
                .any(|s| s.eq_ignore_ascii_case(suffix))
        {
            config.market_suffixes.push(suffix.to_string());
        }
        config
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            weights: self.weights,
            thresholds: self.thresholds,
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            history_days: self.history_days,
            max_concurrency: self.max_concurrency,
            default_market_suffix: self.default_market_suffix.clone(),
            technicals: TechnicalsConfig {
                sma_fast: self.sma_fast,
                sma_slow: self.sma_slow,
                rsi_period: self.rsi_period,
            },
        }
    }

    pub fn pipeline(&self) -> PipelineSettings {
        PipelineSettings {
            universe: UniverseConfig {
                max_symbols: self.max_symbols,
                include_baseline: self.include_baseline,
                include_watchlist: self.include_watchlist,
            },
            min_link_confidence: self.min_link_confidence,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return default;
    }
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!("Invalid value for {}: {:?}, using default {}", key, raw, default);
            default
        }
    }
}

fn flag_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "" => default,
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            tracing::warn!("Invalid value for {}: {:?}, using default {}", key, other, default);
            default
        }
    }
}
