use analysis_core::AnalysisResult;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

const EMPTY_RECOMMENDATIONS: &str = "note\nNo symbols selected today\n";

/// `<out_dir>/<YYYY-MM-DD>`, created if missing
pub fn run_dir(out_dir: impl AsRef<Path>, run_date: NaiveDate) -> Result<PathBuf> {
    let dir = out_dir.as_ref().join(run_date.format("%Y-%m-%d").to_string());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    Ok(dir)
}

/// One row per ranked result, or a placeholder note when nothing was selected
pub fn write_recommendations(path: &Path, results: &[AnalysisResult]) -> Result<()> {
    if results.is_empty() {
        std::fs::write(path, EMPTY_RECOMMENDATIONS)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(());
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
