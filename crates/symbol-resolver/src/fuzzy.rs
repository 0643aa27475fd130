//! Weighted string similarity, 0 to 100.
//!
//! The top-level [`wratio`] blends a plain edit-distance ratio with
//! token-sorted, token-set and partial (best substring window) variants, so
//! that reordered words ("Corp Alpha Beta") and mentions that are a fragment
//! of a longer name still score high.

use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

const TOKEN_SCALE: f64 = 0.95;
const PARTIAL_SCALE: f64 = 0.9;
const LONG_PARTIAL_SCALE: f64 = 0.6;

/// Edit-distance similarity; 0 if either side is empty
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// Best [`ratio`] of the shorter string against every same-length window of the longer one
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long, short_str) = if a_chars.len() <= b_chars.len() {
        (&a_chars, &b_chars, a)
    } else {
        (&b_chars, &a_chars, b)
    };

    if short.is_empty() {
        return 0.0;
    }
    if short.len() == long.len() {
        return ratio(a, b);
    }

    let mut best = 0.0_f64;
    for window in long.windows(short.len()) {
        let candidate: String = window.iter().collect();
        best = best.max(ratio(short_str, &candidate));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn tokens(s: &str) -> BTreeSet<&str> {
    s.split_whitespace().collect()
}

fn sorted_join(s: &str) -> String {
    let mut words: Vec<&str> = s.split_whitespace().collect();
    words.sort_unstable();
    words.join(" ")
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_join(a), &sorted_join(b))
}

pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    let shared: Vec<&str> = ta.intersection(&tb).copied().collect();
    let only_a: Vec<&str> = ta.difference(&tb).copied().collect();
    let only_b: Vec<&str> = tb.difference(&ta).copied().collect();

    // One token set fully contains the other
    if !shared.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let sect = shared.join(" ");
    let combined_a = join_parts(&[&sect, &only_a.join(" ")]);
    let combined_b = join_parts(&[&sect, &only_b.join(" ")]);

    ratio(&sect, &combined_a)
        .max(ratio(&sect, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

pub fn partial_token_sort_ratio(a: &str, b: &str) -> f64 {
    partial_ratio(&sorted_join(a), &sorted_join(b))
}

pub fn partial_token_set_ratio(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.intersection(&tb).next().is_some() {
        return 100.0;
    }
    let only_a: Vec<&str> = ta.difference(&tb).copied().collect();
    let only_b: Vec<&str> = tb.difference(&ta).copied().collect();
    partial_ratio(&only_a.join(" "), &only_b.join(" "))
}

/// Weighted ratio: picks the best of the full, token and partial scorers,
/// discounting the partial ones more as the length mismatch grows.
pub fn wratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 100.0;
    }

    let len_a = a.chars().count() as f64;
    let len_b = b.chars().count() as f64;
    let len_ratio = len_a.max(len_b) / len_a.min(len_b);

    let full = ratio(a, b);

    let best = if len_ratio < 1.5 {
        full.max(token_sort_ratio(a, b) * TOKEN_SCALE)
            .max(token_set_ratio(a, b) * TOKEN_SCALE)
    } else {
        let scale = if len_ratio < 8.0 { PARTIAL_SCALE } else { LONG_PARTIAL_SCALE };
        full.max(partial_ratio(a, b) * scale)
            .max(partial_token_sort_ratio(a, b) * TOKEN_SCALE * scale)
            .max(partial_token_set_ratio(a, b) * TOKEN_SCALE * scale)
    };

    best.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_100() {
        assert_eq!(wratio("alpha beta corp", "alpha beta corp"), 100.0);
        assert_eq!(ratio("abc", "abc"), 100.0);
    }

    #[test]
    fn test_empty_side_scores_zero() {
        assert_eq!(wratio("", "abc"), 0.0);
        assert_eq!(wratio("abc", ""), 0.0);
        assert_eq!(partial_ratio("", "abc"), 0.0);
    }

    #[test]
    fn test_word_reordering_tolerated() {
        let score = wratio("beta alpha corp", "alpha beta corp");
        assert!(score >= 94.0, "score was {}", score);
    }

    #[test]
    fn test_partial_overlap() {
        assert_eq!(partial_ratio("beta", "alpha beta corp"), 100.0);
        let score = wratio("infosys", "infosys limited");
        assert!(score >= 85.0, "score was {}", score);
    }

    #[test]
    fn test_token_set_subset() {
        assert_eq!(token_set_ratio("hdfc bank", "hdfc bank ltd"), 100.0);
    }

    #[test]
    fn test_unrelated_strings_score_low() {
        let score = wratio("zzzz qqqq", "alpha beta corp");
        assert!(score < 50.0, "score was {}", score);
    }

    #[test]
    fn test_scores_bounded() {
        let pairs = [
            ("a", "abcdefghijklmnopqrstuvwxyz"),
            ("tata motors", "tata"),
            ("x y z", "z y x"),
            ("reliance", "reliance industries limited"),
        ];
        for (a, b) in pairs {
            let s = wratio(a, b);
            assert!((0.0..=100.0).contains(&s), "{} vs {} -> {}", a, b, s);
        }
    }
}
