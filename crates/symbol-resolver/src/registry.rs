//! Symbol master, baseline, watchlist and manual alias loaders.

use analysis_core::SymbolRegistryEntry;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SymbolMasterRow {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    sector: String,
    #[serde(default)]
    yahoo: String,
    #[serde(default)]
    aliases: String,
}

#[derive(Debug, Deserialize)]
struct SymbolRow {
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    alias: String,
}

/// Trimmed, non-empty strings with case-insensitive duplicates removed (first spelling kept)
pub(crate) fn unique_case_insensitive<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let s = item.as_ref().trim();
        if s.is_empty() {
            continue;
        }
        if seen.insert(s.to_lowercase()) {
            out.push(s.to_string());
        }
    }
    out
}

/// Aliases are separated by `;` or `,`
fn split_aliases(s: &str) -> Vec<String> {
    s.split(|c: char| c == ';' || c == ',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn csv_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))
}

/// Load the symbol master (`symbol,name,sector,yahoo,aliases`).
///
/// Rows without a symbol are skipped; a missing market id defaults to
/// `<SYMBOL><default_suffix>`.
pub fn load_symbol_master(path: impl AsRef<Path>, default_suffix: &str) -> Result<Vec<SymbolRegistryEntry>> {
    let path = path.as_ref();
    let mut reader = csv_reader(path)?;
    let mut entries = Vec::new();

    for row in reader.deserialize::<SymbolMasterRow>() {
        let row = row.with_context(|| format!("Malformed row in {}", path.display()))?;
        let symbol = row.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        let market_id = if row.yahoo.trim().is_empty() {
            format!("{}{}", symbol, default_suffix)
        } else {
            row.yahoo.trim().to_string()
        };

        entries.push(SymbolRegistryEntry {
            symbol,
            name: row.name,
            sector: row.sector,
            market_id,
            aliases: unique_case_insensitive(split_aliases(&row.aliases)),
        });
    }

    tracing::info!("Loaded {} symbols from {}", entries.len(), path.display());
    Ok(entries)
}

/// Load a CSV with a `symbol` column
pub fn load_baseline_symbols(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let mut reader = csv_reader(path)?;
    let mut out = Vec::new();

    for row in reader.deserialize::<SymbolRow>() {
        let row = row.with_context(|| format!("Malformed row in {}", path.display()))?;
        let symbol = row.symbol.trim().to_uppercase();
        if !symbol.is_empty() {
            out.push(symbol);
        }
    }
    Ok(out)
}

/// One symbol per line; blank lines and `#` comments are ignored
pub fn load_watchlist(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read watchlist {}", path.display()))?;

    Ok(content
        .lines()
        .map(|line| line.trim().to_uppercase())
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .collect())
}

/// Load `symbol,alias` pairs. An unreadable source is an empty table, never an error.
pub fn load_manual_aliases(path: impl AsRef<Path>) -> HashMap<String, Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return HashMap::new();
    }

    let mut reader = match csv_reader(path) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("Ignoring manual aliases: {:#}", e);
            return HashMap::new();
        }
    };

    let mut raw: HashMap<String, Vec<String>> = HashMap::new();
    for row in reader.deserialize::<AliasRow>() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping malformed alias row in {}: {}", path.display(), e);
                continue;
            }
        };
        let symbol = row.symbol.trim().to_uppercase();
        let alias = row.alias.trim();
        if symbol.is_empty() || alias.is_empty() {
            continue;
        }
        raw.entry(symbol).or_default().push(alias.to_string());
    }

    raw.into_iter()
        .map(|(symbol, aliases)| (symbol, unique_case_insensitive(aliases)))
        .collect()
}
