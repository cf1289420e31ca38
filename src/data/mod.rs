//! Data model and collaborator ports for the analysis pipeline.
//! Provides validated price series, raw and processed news items,
//! and the error taxonomy shared by every stage.

pub mod errors;
pub mod indicators;
pub mod market;
pub mod news;
pub mod sentiment;

// Re-export commonly used types
pub use errors::{PipelineError, PipelineResult};
pub use indicators::{compute_indicators, IndicatorSeries, TechSnapshot};
pub use market::{PriceFeed, YahooChartClient};
pub use news::{GoogleNewsClient, NewsFeed};
pub use sentiment::{process_articles, SentimentLabel};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bar of OHLCV price data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// An ordered price history for one ticker.
///
/// Construction validates ordering and bar shape; the series is immutable
/// afterwards (read access only through `bars()`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from raw bars, validating the pipeline's input
    /// invariants: non-empty, strictly ascending timestamps, well-formed
    /// OHLC envelope. Violations are `MalformedInput`.
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> PipelineResult<Self> {
        let ticker = ticker.into();
        validation::validate_ticker(&ticker)?;

        if bars.is_empty() {
            return Err(PipelineError::malformed("bars", "Price series is empty"));
        }

        for window in bars.windows(2) {
            if window[1].timestamp <= window[0].timestamp {
                return Err(PipelineError::malformed(
                    "timestamp",
                    "Timestamps must be strictly ascending with no duplicates",
                ));
            }
        }

        for bar in &bars {
            validation::validate_bar(bar)?;
        }

        Ok(Self { ticker, bars })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// A raw, unscored news headline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub source: String,
}

/// A news item after summarization and sentiment scoring.
/// `sentiment_score` and `sentiment_label` are pure functions of `summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedNewsItem {
    pub headline: String,
    pub link: String,
    pub source: String,
    pub summary: String,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
}

/// Validation helpers
pub mod validation {
    use super::*;

    /// Validate a stock ticker symbol (basic US market symbols)
    pub fn validate_ticker(ticker: &str) -> PipelineResult<()> {
        if ticker.is_empty() {
            return Err(PipelineError::malformed("ticker", "Ticker cannot be empty"));
        }

        if ticker.len() > 10 {
            return Err(PipelineError::malformed(
                "ticker",
                "Ticker too long (max 10 chars)",
            ));
        }

        if !ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(PipelineError::malformed(
                "ticker",
                "Ticker must be alphanumeric (with . or -)",
            ));
        }

        Ok(())
    }

    /// Validate a single OHLCV bar
    pub fn validate_bar(bar: &PriceBar) -> PipelineResult<()> {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(PipelineError::malformed(
                "close",
                "Close price must be positive and finite",
            ));
        }

        if !bar.open.is_finite() || bar.open <= 0.0 {
            return Err(PipelineError::malformed(
                "open",
                "Open price must be positive and finite",
            ));
        }

        if bar.volume < 0 {
            return Err(PipelineError::malformed(
                "volume",
                "Volume cannot be negative",
            ));
        }

        if bar.high < bar.low {
            return Err(PipelineError::malformed(
                "high_low",
                "High price cannot be less than low price",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(ts: i64, close: f64) -> PriceBar {
        PriceBar {
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn test_series_rejects_unsorted_timestamps() {
        let bars = vec![bar(200, 10.0), bar(100, 11.0)];
        let result = PriceSeries::new("AMD", bars);
        assert!(matches!(
            result,
            Err(PipelineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_series_rejects_duplicate_timestamps() {
        let bars = vec![bar(100, 10.0), bar(100, 11.0)];
        assert!(PriceSeries::new("AMD", bars).is_err());
    }

    #[test]
    fn test_series_rejects_empty() {
        assert!(PriceSeries::new("AMD", vec![]).is_err());
    }

    #[test]
    fn test_series_accepts_well_formed_bars() {
        let bars = vec![bar(100, 10.0), bar(200, 10.5), bar(300, 11.0)];
        let series = PriceSeries::new("AMD", bars).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.ticker(), "AMD");
    }

    #[test]
    fn test_validate_ticker() {
        assert!(validation::validate_ticker("AVGO").is_ok());
        assert!(validation::validate_ticker("BRK.B").is_ok());
        assert!(validation::validate_ticker("").is_err());
        assert!(validation::validate_ticker("WAY_TOO_LONG_TICKER").is_err());
    }
}
