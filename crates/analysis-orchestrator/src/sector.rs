use analysis_core::AnalysisResult;
use std::collections::BTreeMap;

const UNKNOWN_SECTOR: &str = "Unknown";

/// Average symbol sentiment per sector.
///
/// Symbols without a sentiment are ignored, so sectors with no sentiment
/// data at all are absent from the output.
pub fn compute_sector_boom(results: &[AnalysisResult]) -> BTreeMap<String, f64> {
    let mut acc: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for r in results {
        let Some(sentiment) = r.sentiment.filter(|s| s.is_finite()) else {
            continue;
        };
        let sector = match r.sector.trim() {
            "" => UNKNOWN_SECTOR.to_string(),
            s => s.to_string(),
        };
        let entry = acc.entry(sector).or_insert((0.0, 0));
        entry.0 += sentiment;
        entry.1 += 1;
    }

    acc.into_iter()
        .map(|(sector, (sum, n))| (sector, sum / n.max(1) as f64))
        .collect()
}
