use crate::dedup::{dedup_articles, Identity};
use analysis_core::{Article, RawArticle};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Hex SHA-256 of an article signature
pub fn stable_digest(signature: &str) -> String {
    hex::encode(Sha256::digest(signature.as_bytes()))
}

/// Best-effort conversion of collector timestamps to RFC 3339 UTC.
///
/// Date-only values read as midnight UTC. Anything else that does not parse
/// is kept verbatim: only an empty value means an unknown publish time.
pub fn normalize_published_at(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }

    let parsed = DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            [
                "%Y%m%d%H%M%S",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%dT%H:%M:%S%.f",
            ]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(|naive| naive.and_utc())
        });

    match parsed {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => {
            tracing::debug!("Unrecognized published_at {:?}, keeping as-is", value);
            value.to_string()
        }
    }
}

fn to_article(raw: RawArticle) -> Article {
    let digest = stable_digest(&raw.signature());
    Article {
        digest,
        title: raw.title.unwrap_or_default().trim().to_string(),
        url: raw.url.unwrap_or_default().trim().to_string(),
        source: raw.source.unwrap_or_default().trim().to_string(),
        published_at: normalize_published_at(raw.published_at.as_deref().unwrap_or("")),
        summary: raw.summary.unwrap_or_default().trim().to_string(),
    }
}

/// Dedup collector records and normalize the survivors.
/// Digests are unique in the output because they derive from the dedup signature.
pub fn normalize_articles(raw: impl IntoIterator<Item = RawArticle>) -> Vec<Article> {
    dedup_articles(raw).into_iter().map(to_article).collect()
}

/// Read a JSON array of collector records
pub fn load_raw_articles(path: impl AsRef<Path>) -> Result<Vec<RawArticle>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read articles from {}", path.display()))?;
    let articles: Vec<RawArticle> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid article JSON in {}", path.display()))?;
    Ok(articles)
}
