//! Yahoo Finance chart (v8) quote source

use super::{FetchWindow, QuoteSource};
use crate::error::SourceError;
use chrono::DateTime;
use forecast_rate::data::{Bar, QuoteSeries};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = concat!("cross-rate/", env!("CARGO_PKG_VERSION"));

/// Blocking client for `/v8/finance/chart/{symbol}`
#[derive(Debug, Clone)]
pub struct YahooChartSource {
    client: Client,
    base_url: String,
}

impl YahooChartSource {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host, e.g. a local mock server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }
}

impl QuoteSource for YahooChartSource {
    fn fetch(&self, symbol: &str, window: &FetchWindow) -> Result<QuoteSeries, SourceError> {
        let response = self
            .client
            .get(self.endpoint(symbol))
            .query(&[
                ("range", window.period.as_str()),
                ("interval", window.interval.as_str()),
            ])
            .send()?;

        let status = response.status();
        let body = response.text()?;
        debug!(symbol, %status, bytes = body.len(), "yahoo chart response");

        // Unknown symbols come back as 404 with a chart error payload
        match parse_chart(symbol, &body) {
            Ok(series) if status.is_success() => Ok(series),
            Ok(_) => Err(SourceError::unavailable(symbol, format!("HTTP {}", status))),
            Err(err) if status.is_success() => Err(err),
            Err(SourceError::Unavailable { reason, .. }) => Err(SourceError::unavailable(
                symbol,
                format!("HTTP {}: {}", status, reason),
            )),
            Err(_) => Err(SourceError::unavailable(symbol, format!("HTTP {}", status))),
        }
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(rename = "gmtoffset", default)]
    gmt_offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Decode a chart response body into a daily series.
///
/// Rows with any missing price are skipped. Bar dates are taken in the
/// exchange's local time so daily bars do not slip to the previous day.
pub fn parse_chart(symbol: &str, body: &str) -> Result<QuoteSeries, SourceError> {
    let response: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::Parse(format!("failed to parse yahoo chart: {}", e)))?;

    if let Some(error) = response.chart.error {
        return Err(SourceError::unavailable(
            symbol,
            format!("{} {}", error.code, error.description).trim().to_string(),
        ));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(QuoteSeries::empty());
    };
    let offset = result.meta.map(|m| m.gmt_offset).unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let prices = (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
        );
        let (Some(open), Some(high), Some(low), Some(close)) = prices else {
            continue;
        };
        let date = ts
            .checked_add(offset)
            .and_then(|local| DateTime::from_timestamp(local, 0))
            .ok_or_else(|| SourceError::Parse(format!("invalid timestamp: {}", ts)))?
            .date_naive();
        bars.push(Bar::new(date, open, high, low, close));
    }

    Ok(QuoteSeries::from_bars(bars))
}
