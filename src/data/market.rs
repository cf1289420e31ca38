//! Price data collaborator.
//! The pipeline only depends on the `PriceFeed` port; the concrete client
//! wraps the Yahoo Finance chart API with an explicit timeout and a single
//! attempt per call.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

use super::{validation, PipelineError, PipelineResult, PriceBar, PriceSeries};

/// Port for fetching a price history snapshot.
/// A failure here is fatal for the ticker being processed.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_history(&self, ticker: &str, lookback_days: u32) -> PipelineResult<PriceSeries>;
}

/// Yahoo Finance chart API response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

/// Daily OHLCV client backed by the Yahoo Finance chart API
pub struct YahooChartClient {
    http_client: reqwest::Client,
    timeout_seconds: u64,
}

impl YahooChartClient {
    pub fn new(timeout_seconds: u64) -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("stockwatch/0.1.0")
            .build()
            .map_err(PipelineError::Fetch)?;

        Ok(Self {
            http_client,
            timeout_seconds,
        })
    }

    fn chart_url(ticker: &str, lookback_days: u32) -> String {
        let period2 = Utc::now();
        let period1 = period2 - ChronoDuration::days(lookback_days as i64);
        format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            urlencoding::encode(ticker),
            period1.timestamp(),
            period2.timestamp()
        )
    }

    /// Convert the columnar chart payload into bars, skipping rows where
    /// any field is null (non-trading gaps in the Yahoo feed).
    fn into_bars(result: ChartResult) -> PipelineResult<Vec<PriceBar>> {
        let timestamps = result
            .timestamp
            .ok_or_else(|| PipelineError::parse_error("No timestamps in chart response"))?;
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::parse_error("No quote block in chart response"))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let fields = (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
                quote.volume.get(i).copied().flatten(),
            );
            if let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = fields {
                let timestamp: DateTime<Utc> = Utc
                    .timestamp_opt(ts, 0)
                    .single()
                    .ok_or_else(|| PipelineError::parse_error("Invalid timestamp in chart response"))?;
                bars.push(PriceBar {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                });
            }
        }

        Ok(bars)
    }
}

#[async_trait]
impl PriceFeed for YahooChartClient {
    async fn fetch_history(&self, ticker: &str, lookback_days: u32) -> PipelineResult<PriceSeries> {
        validation::validate_ticker(ticker)?;
        info!(ticker, lookback_days, "Fetching price history");

        let url = Self::chart_url(ticker, lookback_days);
        let response = timeout(
            Duration::from_secs(self.timeout_seconds),
            self.http_client.get(&url).send(),
        )
        .await
        .map_err(|_| PipelineError::Timeout {
            seconds: self.timeout_seconds,
        })??;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::api_error(status, message));
        }

        let payload: ChartResponse = response.json().await?;

        if let Some(error) = payload.chart.error {
            if !error.is_null() {
                return Err(PipelineError::parse_error(format!(
                    "Chart API returned error: {error}"
                )));
            }
        }

        let result = payload
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| PipelineError::parse_error("Empty chart result"))?;

        let bars = Self::into_bars(result)?;
        let series = PriceSeries::new(ticker, bars)?;
        info!(ticker, rows = series.len(), "Fetched price history");
        Ok(series)
    }
}
