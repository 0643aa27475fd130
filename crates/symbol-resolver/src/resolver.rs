use crate::fuzzy::wratio;
use crate::registry::unique_case_insensitive;
use analysis_core::{ResolvedMatch, SymbolRegistryEntry};
use std::collections::HashMap;

pub const DEFAULT_MIN_SCORE: f64 = 80.0;
const EXACT_SCORE: f64 = 100.0;

/// Resolver settings
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Fuzzy matches scoring below this are rejected (0 to 100)
    pub min_score: f64,
    /// Exchange suffixes stripped from market identifiers before indexing
    pub market_suffixes: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            market_suffixes: vec![".NS".to_string(), ".BO".to_string()],
        }
    }
}

/// Lowercase and collapse internal whitespace
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Alias index plus fuzzy fallback over the symbol registry
pub struct SymbolResolver {
    min_score: f64,
    /// Normalized candidate strings in registration order
    candidates: Vec<String>,
    owners: HashMap<String, String>,
}

impl SymbolResolver {
    /// Build the candidate index. `external_aliases` is keyed by uppercase symbol.
    pub fn new(
        registry: &[SymbolRegistryEntry],
        external_aliases: &HashMap<String, Vec<String>>,
        config: &ResolverConfig,
    ) -> Self {
        let min_score = if config.min_score.is_finite() {
            config.min_score
        } else {
            DEFAULT_MIN_SCORE
        };

        let mut candidates = Vec::new();
        let mut owners = HashMap::new();

        for entry in registry {
            let symbol = entry.symbol.trim().to_uppercase();
            if symbol.is_empty() {
                continue;
            }

            let market_id = config
                .market_suffixes
                .iter()
                .fold(entry.market_id.trim(), |id, suffix| id.strip_suffix(suffix.as_str()).unwrap_or(id));

            let mut strings = vec![symbol.clone(), entry.name.clone(), market_id.to_string()];
            strings.extend(entry.aliases.iter().cloned());
            if let Some(extra) = external_aliases.get(&symbol) {
                strings.extend(extra.iter().cloned());
            }

            for s in unique_case_insensitive(strings) {
                let key = normalize(&s);
                if key.is_empty() || owners.contains_key(&key) {
                    continue;
                }
                owners.insert(key.clone(), symbol.clone());
                candidates.push(key);
            }
        }

        tracing::info!(
            "Symbol resolver indexed {} candidate strings for {} registry entries",
            candidates.len(),
            registry.len()
        );

        Self {
            min_score,
            candidates,
            owners,
        }
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Resolve one entity string; `None` when empty or below the minimum score
    pub fn map_one(&self, entity: &str) -> Option<ResolvedMatch> {
        let query = normalize(entity);
        if query.is_empty() {
            return None;
        }

        if let Some(symbol) = self.owners.get(&query) {
            return Some(ResolvedMatch {
                symbol: symbol.clone(),
                score: EXACT_SCORE,
                matched_text: entity.to_string(),
            });
        }

        let mut best: Option<(&String, f64)> = None;
        for candidate in &self.candidates {
            let score = wratio(&query, candidate);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }

        let (candidate, score) = best?;
        if score < self.min_score {
            return None;
        }

        let symbol = self.owners.get(candidate)?;
        Some(ResolvedMatch {
            symbol: symbol.clone(),
            score,
            matched_text: candidate.clone(),
        })
    }

    /// Resolve many entities, keeping the best match per symbol, ordered by
    /// score descending then symbol ascending.
    pub fn map_entities<S: AsRef<str>>(&self, entities: &[S]) -> Vec<ResolvedMatch> {
        let mut best: HashMap<String, ResolvedMatch> = HashMap::new();

        for entity in entities {
            let Some(m) = self.map_one(entity.as_ref()) else {
                continue;
            };
            match best.get(&m.symbol) {
                Some(existing) if existing.score >= m.score => {}
                _ => {
                    best.insert(m.symbol.clone(), m);
                }
            }
        }

        let mut out: Vec<ResolvedMatch> = best.into_values().collect();
        out.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.symbol.cmp(&b.symbol)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str, name: &str, market_id: &str, aliases: &[&str]) -> SymbolRegistryEntry {
        SymbolRegistryEntry {
            symbol: symbol.to_string(),
            name: name.to_string(),
            sector: "Tech".to_string(),
            market_id: market_id.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn registry() -> Vec<SymbolRegistryEntry> {
        vec![
            entry("ABC", "Alpha Beta Corp", "ABC.NS", &["ABC Ltd"]),
            entry("INFY", "Infosys Limited", "INFY.NS", &["Infosys"]),
            entry("TCS", "Tata Consultancy Services", "TCS.NS", &[]),
            entry("HDFCBANK", "HDFC Bank", "HDFCBANK.NS", &[]),
        ]
    }

    fn resolver() -> SymbolResolver {
        SymbolResolver::new(&registry(), &HashMap::new(), &ResolverConfig::default())
    }

    #[test]
    fn test_exact_name_match_case_insensitive() {
        let m = resolver().map_one("alpha beta corp").unwrap();
        assert_eq!(m.symbol, "ABC");
        assert_eq!(m.score, 100.0);
        assert_eq!(m.matched_text, "alpha beta corp");
    }

    #[test]
    fn test_exact_match_collapses_whitespace() {
        let m = resolver().map_one("  Tata   Consultancy\tServices ").unwrap();
        assert_eq!(m.symbol, "TCS");
        assert_eq!(m.score, 100.0);
    }

    #[test]
    fn test_market_suffix_stripped() {
        let config = ResolverConfig::default();
        let reg = vec![entry("RELIANCE", "Reliance Industries", "RELIND.NS", &[])];
        let r = SymbolResolver::new(&reg, &HashMap::new(), &config);
        let m = r.map_one("relind").unwrap();
        assert_eq!(m.symbol, "RELIANCE");
        assert_eq!(m.score, 100.0);
    }

    #[test]
    fn test_external_aliases_indexed() {
        let mut external = HashMap::new();
        external.insert("TCS".to_string(), vec!["Tata Consult".to_string()]);
        let r = SymbolResolver::new(&registry(), &external, &ResolverConfig::default());
        let m = r.map_one("TATA CONSULT").unwrap();
        assert_eq!(m.symbol, "TCS");
        assert_eq!(m.score, 100.0);
    }

    #[test]
    fn test_first_registration_wins() {
        let reg = vec![
            entry("AAA", "Shared Name", "AAA.NS", &[]),
            entry("BBB", "Shared Name", "BBB.NS", &[]),
        ];
        let r = SymbolResolver::new(&reg, &HashMap::new(), &ResolverConfig::default());
        assert_eq!(r.map_one("shared name").unwrap().symbol, "AAA");
        assert_eq!(r.map_one("bbb").unwrap().symbol, "BBB");
    }

    #[test]
    fn test_fuzzy_match_above_threshold() {
        let m = resolver().map_one("Infosys Ltd").unwrap();
        assert_eq!(m.symbol, "INFY");
        assert!(m.score >= 80.0 && m.score < 100.0);
    }

    #[test]
    fn test_rejects_below_min_score() {
        let r = resolver();
        assert!(r.map_one("Quantum Widgets Holdings").is_none());
        assert!(r.map_one("").is_none());
        assert!(r.map_one("   ").is_none());
    }

    #[test]
    fn test_never_returns_below_min_score() {
        let config = ResolverConfig {
            min_score: 95.0,
            ..ResolverConfig::default()
        };
        let r = SymbolResolver::new(&registry(), &HashMap::new(), &config);
        for entity in ["Infosys Ltd", "Alpha Beta", "HDFC", "Tata Consult Svcs", "ABC"] {
            if let Some(m) = r.map_one(entity) {
                assert!(m.score >= 95.0, "{} -> {:?}", entity, m);
            }
        }
    }

    #[test]
    fn test_nan_min_score_falls_back_to_default() {
        let config = ResolverConfig {
            min_score: f64::NAN,
            ..ResolverConfig::default()
        };
        let r = SymbolResolver::new(&registry(), &HashMap::new(), &config);
        assert_eq!(r.min_score(), DEFAULT_MIN_SCORE);
    }

    #[test]
    fn test_map_entities_keeps_best_per_symbol_and_orders() {
        let r = resolver();
        let out = r.map_entities(&["Infosys Ltd", "INFY", "HDFC Bank", "ABC", "nothing matches here at all"]);

        let symbols: Vec<&str> = out.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ABC", "HDFCBANK", "INFY"]);
        assert!(out.iter().all(|m| m.score == 100.0));
    }

    #[test]
    fn test_map_entities_orders_by_score_then_symbol() {
        let r = resolver();
        let out = r.map_entities(&["Infosys Ltd", "TCS", "ABC"]);
        assert_eq!(out[0].symbol, "ABC");
        assert_eq!(out[1].symbol, "TCS");
        assert_eq!(out[2].symbol, "INFY");
        assert!(out[2].score < 100.0);

        for pair in out.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_map_entities_unique_symbols() {
        let r = resolver();
        let out = r.map_entities(&["abc", "ABC Ltd", "Alpha Beta Corp", "alpha beta"]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].symbol, "ABC");
        assert_eq!(out[0].score, 100.0);
    }
}
