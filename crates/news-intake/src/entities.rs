use analysis_core::{Article, EntityExtractor};
use regex::Regex;
use std::collections::BTreeSet;

/// Upper-case tokens that are market/macro jargon rather than tickers
const STOP_TOKENS: &[&str] = &["NSE", "BSE", "NS", "BO", "RBI", "GDP", "USD", "FII", "DII", "CEO", "CFO", "IPO", "EPS"];

/// Leading words that turn a capitalized phrase into sentence noise
const PHRASE_STOP_WORDS: &[&str] = &["The", "A", "An", "In", "On", "At", "For", "And", "But", "With"];

const MIN_PHRASE_LEN: usize = 3;
const MAX_PHRASE_LEN: usize = 60;

/// Pattern-based entity extraction over article titles and summaries.
///
/// Picks up exchange-prefixed tickers (`NSE: TCS`), provider-suffixed tickers
/// (`INFY.NS`), bare upper-case tokens, and capitalized multi-word phrases
/// ("Tata Consultancy Services").
pub struct RegexEntityExtractor {
    ticker_patterns: Vec<Regex>,
    upper_token: Regex,
    proper_phrase: Regex,
}

impl Default for RegexEntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexEntityExtractor {
    pub fn new() -> Self {
        let ticker_patterns = [
            r"\bNSE\s*[:\-]\s*([A-Z]{2,15})\b",
            r"\bBSE\s*[:\-]\s*([A-Z]{2,15})\b",
            r"\b([A-Z]{2,15})\.NS\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static ticker pattern"))
        .collect();

        Self {
            ticker_patterns,
            upper_token: Regex::new(r"\b[A-Z]{2,12}\b").expect("static token pattern"),
            proper_phrase: Regex::new(r"\b[A-Z][a-z]+(?:\s+(?:&\s+)?[A-Z][a-z]+){1,4}\b")
                .expect("static phrase pattern"),
        }
    }

    fn extract_from_text(&self, blob: &str) -> BTreeSet<String> {
        let mut candidates = BTreeSet::new();

        for pattern in &self.ticker_patterns {
            for caps in pattern.captures_iter(blob) {
                if let Some(m) = caps.get(1) {
                    candidates.insert(m.as_str().trim().to_string());
                }
            }
        }

        for token in self.upper_token.find_iter(blob) {
            if STOP_TOKENS.contains(&token.as_str()) {
                continue;
            }
            candidates.insert(token.as_str().to_string());
        }

        for phrase in self.proper_phrase.find_iter(blob) {
            let mut words: Vec<&str> = phrase.as_str().split_whitespace().collect();
            while words.first().is_some_and(|w| PHRASE_STOP_WORDS.contains(w)) {
                words.remove(0);
            }
            if words.len() < 2 {
                continue;
            }
            let text = words.join(" ");
            if (MIN_PHRASE_LEN..=MAX_PHRASE_LEN).contains(&text.len()) {
                candidates.insert(text);
            }
        }

        candidates
    }
}

impl EntityExtractor for RegexEntityExtractor {
    fn extract(&self, articles: &[Article]) -> Vec<String> {
        let blob = articles
            .iter()
            .map(|a| a.text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let entities: Vec<String> = self.extract_from_text(&blob).into_iter().collect();
        tracing::debug!("Extracted {} candidate entities from {} articles", entities.len(), articles.len());
        entities
    }
}
