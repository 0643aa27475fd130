use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseConfig {
    pub max_symbols: usize,
    pub include_baseline: bool,
    pub include_watchlist: bool,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            max_symbols: 120,
            include_baseline: true,
            include_watchlist: true,
        }
    }
}

/// Merge news-driven symbols, then baseline, then watchlist.
///
/// Symbols are trimmed and uppercased; empties and repeats are dropped so the
/// first appearance decides the position. The result is capped at
/// `max_symbols`.
pub fn pick_universe<S: AsRef<str>>(
    news_symbols: &[S],
    baseline: &[S],
    watchlist: &[S],
    config: &UniverseConfig,
) -> Vec<String> {
    let mut merged = Vec::new();
    let mut seen = HashSet::new();

    let mut add_many = |symbols: &[S]| {
        for s in symbols {
            let symbol = s.as_ref().trim().to_uppercase();
            if symbol.is_empty() || !seen.insert(symbol.clone()) {
                continue;
            }
            merged.push(symbol);
        }
    };

    add_many(news_symbols);
    if config.include_baseline {
        add_many(baseline);
    }
    if config.include_watchlist {
        add_many(watchlist);
    }

    merged.truncate(config.max_symbols);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_order_and_cap() {
        let config = UniverseConfig {
            max_symbols: 3,
            ..UniverseConfig::default()
        };
        let out = pick_universe(&["A", "B"], &["B", "C"], &["C", "D"], &config);
        assert_eq!(out, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_normalizes_and_skips_empty() {
        let out = pick_universe(&[" tcs ", "", "TCS"], &["infy"], &["  "], &UniverseConfig::default());
        assert_eq!(out, vec!["TCS", "INFY"]);
    }

    #[test]
    fn test_sources_can_be_disabled() {
        let config = UniverseConfig {
            include_baseline: false,
            include_watchlist: false,
            ..UniverseConfig::default()
        };
        let out = pick_universe(&["A"], &["B"], &["C"], &config);
        assert_eq!(out, vec!["A"]);

        let config = UniverseConfig {
            include_baseline: false,
            ..UniverseConfig::default()
        };
        assert_eq!(pick_universe(&["A"], &["B"], &["C"], &config), vec!["A", "C"]);
    }

    #[test]
    fn test_zero_cap_is_empty() {
        let config = UniverseConfig {
            max_symbols: 0,
            ..UniverseConfig::default()
        };
        assert!(pick_universe(&["A"], &["B"], &["C"], &config).is_empty());
    }
}
