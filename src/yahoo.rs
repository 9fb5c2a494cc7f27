use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum YahooError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid response body: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("chart API error: {0}")]
    Api(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One trading day. `time` is midnight UTC of the session date in the
/// exchange's timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub symbol: Option<String>,
}

/// Source of historical daily bars.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars for `symbol` in `[start, end)`, ascending by date.
    async fn daily_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyBar>, YahooError>;
}

// --- Chart API wire format ---

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
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

pub struct YahooClient {
    client: Client,
    base_url: String,
    user_agents: Vec<String>,
    random_agent: bool,
}

impl YahooClient {
    pub fn new(random_agent: bool) -> Result<Self, YahooError> {
        let client = Client::builder().gzip(true).build()?;

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15".to_string(),
        ];

        Ok(YahooClient {
            client,
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart/".to_string(),
            user_agents,
            random_agent,
        })
    }

    fn get_user_agent(&self) -> String {
        if self.random_agent {
            use rand::seq::IndexedRandom;
            self.user_agents
                .choose(&mut rand::rng())
                .unwrap_or(&self.user_agents[0])
                .clone()
        } else {
            self.user_agents[0].clone()
        }
    }

    pub fn chart_url(&self, symbol: &str) -> String {
        format!("{}{}", self.base_url, symbol)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn daily_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyBar>, YahooError> {
        let url = self.chart_url(symbol);
        let period1 = start.timestamp().to_string();
        let period2 = end.timestamp().to_string();

        debug!(symbol, %start, %end, "Requesting daily bars");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "history"),
                ("includePrePost", "false"),
            ])
            .header("User-Agent", self.get_user_agent())
            .header("Accept", "application/json, text/plain, */*")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Unknown symbols come back as 404 with a chart error object
            if let Ok(envelope) = serde_json::from_str::<ChartEnvelope>(&body) {
                if let Some(err) = envelope.chart.error {
                    warn!(symbol, code = %err.code, "Chart API returned an error");
                    return Err(YahooError::Api(format!("{}: {}", err.code, err.description)));
                }
            }
            return Err(YahooError::Status { status, body });
        }

        let bars = parse_chart(&body, symbol)?;
        debug!(symbol, bars = bars.len(), "Parsed daily bars");
        Ok(bars)
    }
}

fn parse_chart(body: &str, symbol: &str) -> Result<Vec<DailyBar>, YahooError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(err) = envelope.chart.error {
        return Err(YahooError::Api(format!("{}: {}", err.code, err.description)));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let tz: Tz = match result.meta.exchange_timezone_name.as_deref() {
        Some(name) => name.parse().unwrap_or_else(|_| {
            warn!(timezone = name, "Unknown exchange timezone, using UTC");
            Tz::UTC
        }),
        None => Tz::UTC,
    };

    let times = &result.timestamp;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let length = times.len();
    if length > 0 && quote.close.len() != length {
        return Err(YahooError::InvalidResponse(format!(
            "expected {} closes, got {}",
            length,
            quote.close.len()
        )));
    }

    let value_at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten().unwrap_or(0.0);

    let mut bars = Vec::with_capacity(length);
    for (i, &ts) in times.iter().enumerate() {
        // No-trade rows have a null close
        let Some(close) = quote.close[i] else {
            continue;
        };

        let instant = DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
            YahooError::InvalidResponse(format!("Cannot convert timestamp {} at index {}", ts, i))
        })?;
        let session_date = instant.with_timezone(&tz).date_naive();

        bars.push(DailyBar {
            time: session_date.and_time(NaiveTime::MIN).and_utc(),
            open: value_at(&quote.open, i),
            high: value_at(&quote.high, i),
            low: value_at(&quote.low, i),
            close,
            volume: value_at(&quote.volume, i) as u64,
            symbol: Some(symbol.to_string()),
        });
    }

    bars.sort_by(|a, b| a.time.cmp(&b.time));
    Ok(bars)
}
