//! Article sentiment persistence.
//!
//! Three keyed record sets (articles, per-article sentiment, article-symbol
//! links) with upsert-on-conflict semantics, plus the per-symbol sentiment
//! aggregation that feeds the composite scorer. Nothing here deletes rows.

use analysis_core::Article;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;

/// Link confidence used when a caller hands over a non-finite value
pub const DEFAULT_LINK_CONFIDENCE: f64 = 0.7;

fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Sentiment row for one article
#[derive(Debug, Clone)]
pub struct ArticleSentiment {
    pub digest: String,
    pub sentiment: f64,
    pub confidence: f64,
    pub model: String,
}

#[derive(Clone)]
pub struct SentimentStore {
    pool: SqlitePool,
}

impl SentimentStore {
    /// Open (creating if missing) the database and apply the schema
    pub async fn connect(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL {}", database_url))?
            .create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every pooled connection to ":memory:" is a separate database
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open state database {}", database_url))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let schema = include_str!("../schema.sql");

        // sqlx executes one statement per query
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or overwrite articles by digest. `fetched_at` is always the upsert time.
    pub async fn upsert_articles(&self, articles: &[Article]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for article in articles {
            let digest = article.digest.trim();
            if digest.is_empty() {
                tracing::warn!("Skipping article without digest: {:?}", article.title);
                continue;
            }

            let raw_json = serde_json::to_string(article).ok();

            sqlx::query(
                "INSERT INTO articles (digest, url, title, source, published_at, fetched_at, raw_json)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(digest) DO UPDATE SET
                    url = excluded.url,
                    title = excluded.title,
                    source = excluded.source,
                    published_at = excluded.published_at,
                    fetched_at = excluded.fetched_at,
                    raw_json = excluded.raw_json",
            )
            .bind(digest)
            .bind(article.url.trim())
            .bind(article.title.trim())
            .bind(article.source.trim())
            .bind(article.published_at.trim())
            .bind(utc_now_iso())
            .bind(raw_json)
            .execute(&mut *tx)
            .await?;

            written += 1;
        }

        tx.commit().await?;
        tracing::debug!("Upserted {} articles", written);
        Ok(written)
    }

    /// Record the sentiment for one article (last write wins)
    pub async fn save_article_sentiment(
        &self,
        digest: &str,
        sentiment: f64,
        confidence: f64,
        model: &str,
    ) -> Result<()> {
        self.save_article_sentiments(&[ArticleSentiment {
            digest: digest.to_string(),
            sentiment,
            confidence,
            model: model.to_string(),
        }])
        .await
    }

    /// Batch form of [`save_article_sentiment`](Self::save_article_sentiment), one transaction
    pub async fn save_article_sentiments(&self, rows: &[ArticleSentiment]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for row in rows {
            let sentiment = if row.sentiment.is_finite() { row.sentiment } else { 0.0 };
            let confidence = if row.confidence.is_finite() { row.confidence } else { 0.0 };

            sqlx::query(
                "INSERT INTO article_sentiment (digest, sentiment, confidence, model, updated_at)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(digest) DO UPDATE SET
                    sentiment = excluded.sentiment,
                    confidence = excluded.confidence,
                    model = excluded.model,
                    updated_at = excluded.updated_at",
            )
            .bind(&row.digest)
            .bind(sentiment)
            .bind(confidence)
            .bind(&row.model)
            .bind(utc_now_iso())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Link an article to resolved symbols. Symbols are uppercased; empty ones are skipped.
    pub async fn save_article_symbols(
        &self,
        digest: &str,
        links: &[(String, f64)],
        default_confidence: f64,
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for (symbol, confidence) in links {
            let symbol = symbol.trim().to_uppercase();
            if symbol.is_empty() {
                continue;
            }
            let confidence = if confidence.is_finite() { *confidence } else { default_confidence };

            sqlx::query(
                "INSERT INTO article_symbols (digest, symbol, confidence)
                 VALUES (?, ?, ?)
                 ON CONFLICT(digest, symbol) DO UPDATE SET
                    confidence = excluded.confidence",
            )
            .bind(digest)
            .bind(&symbol)
            .bind(confidence)
            .execute(&mut *tx)
            .await?;

            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Average article sentiment per symbol over links with `confidence >= min_confidence`.
    ///
    /// With `since`, only articles published at or after it count, except that
    /// articles with an empty (unknown) `published_at` always pass the recency
    /// filter. Articles without a sentiment row count as 0.0. A failing query
    /// yields an empty map.
    pub async fn aggregate_symbol_sentiment(
        &self,
        since: Option<&str>,
        min_confidence: f64,
    ) -> HashMap<String, f64> {
        match self.try_aggregate_symbol_sentiment(since, min_confidence).await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("Symbol sentiment aggregation unavailable: {:#}", e);
                HashMap::new()
            }
        }
    }

    async fn try_aggregate_symbol_sentiment(
        &self,
        since: Option<&str>,
        min_confidence: f64,
    ) -> Result<HashMap<String, f64>> {
        let min_confidence = if min_confidence.is_finite() { min_confidence } else { 0.0 };
        let since = since.map(str::trim).filter(|s| !s.is_empty());

        let mut sql = String::from(
            "SELECT s.symbol, AVG(COALESCE(t.sentiment, 0.0)) AS avg_sent
             FROM article_symbols s
             JOIN articles a ON a.digest = s.digest
             LEFT JOIN article_sentiment t ON t.digest = s.digest
             WHERE s.confidence >= ?",
        );
        if since.is_some() {
            sql.push_str(" AND (a.published_at >= ? OR a.published_at = '' OR a.published_at IS NULL)");
        }
        sql.push_str(" GROUP BY s.symbol");

        let mut query = sqlx::query_as::<_, (String, Option<f64>)>(&sql).bind(min_confidence);
        if let Some(since) = since {
            query = query.bind(since);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to aggregate symbol sentiment")?;

        let mut out = HashMap::new();
        for (symbol, avg) in rows {
            let symbol = symbol.trim().to_uppercase();
            if symbol.is_empty() {
                continue;
            }
            out.insert(symbol, avg.filter(|v| v.is_finite()).unwrap_or(0.0));
        }

        tracing::info!("Aggregated sentiment for {} symbols", out.len());
        Ok(out)
    }
}
