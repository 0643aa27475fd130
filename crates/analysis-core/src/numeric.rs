//! Small numeric helpers shared by the scoring crates.
//!
//! Every helper treats NaN and infinities as "no value" so that malformed
//! provider numbers degrade to neutral defaults instead of poisoning a score.

/// Clamp into `[0, 1]`; non-finite input maps to `0.5`.
pub fn clip01(x: f64) -> f64 {
    clip(x, 0.0, 1.0, 0.5)
}

/// Clamp into `[lo, hi]`; non-finite input maps to `fallback`.
pub fn clip(x: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if x.is_finite() {
        x.max(lo).min(hi)
    } else {
        fallback
    }
}

/// Returns `x` if it is finite, else `default`.
pub fn finite_or(x: f64, default: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        default
    }
}

/// Drops non-finite values.
pub fn finite(x: Option<f64>) -> Option<f64> {
    x.filter(|v| v.is_finite())
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}
