use analysis_core::{AnalysisError, Bar, FundamentalsProvider, FundamentalsSnapshot, MarketDataProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "defaultKeyStatistics,financialData,summaryDetail";

// Yahoo rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) market-intel/0.1";

const CACHE_TTL_SECS: i64 = 300; // 5 minutes
const MAX_ATTEMPTS: u32 = 3;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Internal cache entry with timestamp
#[derive(Clone)]
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self) -> bool {
        (Utc::now() - self.cached_at).num_seconds() < CACHE_TTL_SECS
    }
}

/// Daily history and valuation data from Yahoo Finance's public endpoints
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    rate_limiter: RateLimiter,
    /// Bars per (market id, days)
    bars_cache: Arc<DashMap<String, CacheEntry<Vec<Bar>>>>,
    fundamentals_cache: Arc<DashMap<String, CacheEntry<FundamentalsSnapshot>>>,
    /// Set once the first rejected fundamentals request has been reported
    auth_warned: Arc<AtomicBool>,
}

/// How a quoteSummary response status is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryStatus {
    Ok,
    /// Yahoo refused the request (missing cookie/crumb); fundamentals stay neutral
    Rejected,
    /// Unknown identifier
    NotFound,
    Failed,
}

fn classify_summary_status(status: StatusCode) -> SummaryStatus {
    match status {
        s if s.is_success() => SummaryStatus::Ok,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SummaryStatus::Rejected,
        StatusCode::NOT_FOUND => SummaryStatus::NotFound,
        _ => SummaryStatus::Failed,
    }
}

impl YahooClient {
    /// `rate_limit` is requests per minute
    pub fn new(rate_limit: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
            bars_cache: Arc::new(DashMap::new()),
            fundamentals_cache: Arc::new(DashMap::new()),
            auth_warned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/{}",
                wait_secs,
                attempt + 1,
                MAX_ATTEMPTS
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(AnalysisError::ApiError(format!(
            "Rate limited by Yahoo after {} retries",
            MAX_ATTEMPTS
        )))
    }

    /// Daily bars for the last `days` days (cached, 5-min TTL).
    /// An unknown identifier yields an empty vector.
    pub async fn get_history(&self, market_id: &str, days: u32) -> Result<Vec<Bar>, AnalysisError> {
        let cache_key = format!("{}:{}", market_id, days);
        if let Some(entry) = self.bars_cache.get(&cache_key) {
            if entry.is_fresh() {
                return Ok(entry.data.clone());
            }
        }

        let now = Utc::now();
        let start = now - ChronoDuration::days(i64::from(days));
        let url = format!("{}/{}", CHART_URL, market_id);

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", now.timestamp().to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ]))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("No chart data for {}", market_id);
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ParseError(e.to_string()))?;

        let bars = bars_from_chart(chart)?;
        tracing::debug!("Fetched {} bars for {}", bars.len(), market_id);

        self.bars_cache.insert(
            cache_key,
            CacheEntry {
                data: bars.clone(),
                cached_at: Utc::now(),
            },
        );

        Ok(bars)
    }

    /// True only for the first rejection seen by this client and its clones
    fn report_rejection(&self) -> bool {
        !self.auth_warned.swap(true, Ordering::SeqCst)
    }

    /// Forward/trailing P/E and ROE (cached, 5-min TTL).
    /// Unauthorized or unknown identifiers yield an empty snapshot.
    pub async fn get_fundamentals(&self, market_id: &str) -> Result<FundamentalsSnapshot, AnalysisError> {
        let cache_key = market_id.to_uppercase();
        if let Some(entry) = self.fundamentals_cache.get(&cache_key) {
            if entry.is_fresh() {
                return Ok(entry.data.clone());
            }
        }

        let url = format!("{}/{}", SUMMARY_URL, market_id);
        let response = self
            .send_request(self.client.get(&url).query(&[("modules", SUMMARY_MODULES)]))
            .await?;

        let status = response.status();
        match classify_summary_status(status) {
            SummaryStatus::Ok => {}
            SummaryStatus::Rejected => {
                if self.report_rejection() {
                    tracing::warn!(
                        "Yahoo rejected fundamentals request for {} (HTTP {}); fundamentals stay neutral this run",
                        market_id,
                        status
                    );
                } else {
                    tracing::debug!("Fundamentals rejected for {} (HTTP {})", market_id, status);
                }
                return Ok(FundamentalsSnapshot::default());
            }
            SummaryStatus::NotFound => {
                tracing::debug!("Fundamentals unavailable for {} (HTTP {})", market_id, status);
                return Ok(FundamentalsSnapshot::default());
            }
            SummaryStatus::Failed => {
                return Err(AnalysisError::ApiError(format!(
                    "HTTP {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                )));
            }
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::ParseError(e.to_string()))?;

        let snapshot = snapshot_from_summary(&body);

        self.fundamentals_cache.insert(
            cache_key,
            CacheEntry {
                data: snapshot.clone(),
                cached_at: Utc::now(),
            },
        );

        Ok(snapshot)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn history(&self, market_id: &str, days: u32) -> Result<Vec<Bar>, AnalysisError> {
        self.get_history(market_id, days).await
    }
}

#[async_trait]
impl FundamentalsProvider for YahooClient {
    async fn fundamentals(&self, market_id: &str) -> Result<FundamentalsSnapshot, AnalysisError> {
        self.get_fundamentals(market_id).await
    }
}

fn at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten().filter(|v| v.is_finite())
}

/// Convert a chart payload into time-ordered bars, skipping rows without a close
fn bars_from_chart(chart: ChartResponse) -> Result<Vec<Bar>, AnalysisError> {
    if let Some(err) = chart.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Ok(Vec::new());
        }
        return Err(AnalysisError::ApiError(format!("{}: {}", err.code, err.description)));
    }

    let Some(result) = chart.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let mut bars: Vec<Bar> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let close = at(&quote.close, i)?;
            let timestamp = DateTime::from_timestamp(ts, 0)?;
            Some(Bar {
                timestamp,
                open: at(&quote.open, i).unwrap_or(close),
                high: at(&quote.high, i).unwrap_or(close),
                low: at(&quote.low, i).unwrap_or(close),
                close,
                volume: at(&quote.volume, i).unwrap_or(0.0),
            })
        })
        .collect();

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Pull valuation fields out of a quote-summary payload. Yahoo wraps numbers
/// as `{"raw": 12.3, "fmt": "12.30"}` and uses `{}` for missing values.
fn snapshot_from_summary(body: &Value) -> FundamentalsSnapshot {
    let result = body.pointer("/quoteSummary/result/0").cloned().unwrap_or(Value::Null);

    let number = |path: &str| {
        result
            .pointer(path)
            .and_then(|v| v.get("raw").or(Some(v)))
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    };

    FundamentalsSnapshot {
        forward_pe: number("/defaultKeyStatistics/forwardPE").or_else(|| number("/summaryDetail/forwardPE")),
        trailing_pe: number("/summaryDetail/trailingPE").or_else(|| number("/defaultKeyStatistics/trailingPE")),
        return_on_equity: number("/financialData/returnOnEquity"),
        raw: result,
    }
}

// Response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}
