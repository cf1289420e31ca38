//! End-to-end pipeline tests over mock collaborator ports.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

use stockwatch::config::Config;
use stockwatch::data::sentiment::SentimentLabel;
use stockwatch::data::{
    NewsFeed, NewsItem, PipelineError, PipelineResult, PriceBar, PriceFeed, PriceSeries,
};
use stockwatch::data::indicators::IndicatorSeries;
use stockwatch::llm::Narrator;
use stockwatch::orchestrator::{ChartRenderer, Pipeline, TickerResult};

fn synthetic_series(ticker: &str, rows: usize) -> PriceSeries {
    let bars: Vec<PriceBar> = (0..rows)
        .map(|i| {
            let close = 100.0 + i as f64;
            PriceBar {
                timestamp: Utc.timestamp_opt(86_400 * (i as i64 + 1), 0).unwrap(),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000,
            }
        })
        .collect();
    PriceSeries::new(ticker, bars).unwrap()
}

/// Price feed that fails for one configured ticker
struct FakePriceFeed {
    fail_for: Option<String>,
    rows: usize,
}

#[async_trait]
impl PriceFeed for FakePriceFeed {
    async fn fetch_history(&self, ticker: &str, _lookback_days: u32) -> PipelineResult<PriceSeries> {
        if self.fail_for.as_deref() == Some(ticker) {
            return Err(PipelineError::api_error(503, "upstream unavailable"));
        }
        Ok(synthetic_series(ticker, self.rows))
    }
}

struct FakeNewsFeed {
    items: Vec<NewsItem>,
    fail: bool,
}

#[async_trait]
impl NewsFeed for FakeNewsFeed {
    async fn fetch_news(&self, _ticker: &str, max_items: usize) -> PipelineResult<Vec<NewsItem>> {
        if self.fail {
            return Err(PipelineError::api_error(500, "feed down"));
        }
        Ok(self.items.iter().take(max_items).cloned().collect())
    }
}

/// Narrator that always returns the same text
struct FixedNarrator(&'static str);

#[async_trait]
impl Narrator for FixedNarrator {
    async fn generate(&self, _system: &str, _prompt: &str) -> PipelineResult<String> {
        Ok(self.0.to_string())
    }
}

/// Narrator that always errors; stages must fall back
struct BrokenNarrator;

#[async_trait]
impl Narrator for BrokenNarrator {
    async fn generate(&self, _system: &str, _prompt: &str) -> PipelineResult<String> {
        Err(PipelineError::NarrativeUnavailable("model offline".to_string()))
    }
}

/// Renderer that returns a fixed image blob
struct FakeChartRenderer;

#[async_trait]
impl ChartRenderer for FakeChartRenderer {
    async fn render(&self, indicators: &IndicatorSeries) -> PipelineResult<String> {
        Ok(format!("chart:{}:{}", indicators.ticker, indicators.rows.len()))
    }
}

/// Renderer that always errors; the ticker must still succeed
struct BrokenChartRenderer;

#[async_trait]
impl ChartRenderer for BrokenChartRenderer {
    async fn render(&self, _indicators: &IndicatorSeries) -> PipelineResult<String> {
        Err(PipelineError::parse_error("render backend unavailable"))
    }
}

fn config_for(tickers: &[&str]) -> Config {
    Config {
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        ..Config::default()
    }
}

fn news_item(title: &str) -> NewsItem {
    NewsItem {
        title: title.to_string(),
        link: "https://example.com".to_string(),
        source: "Test".to_string(),
    }
}

#[tokio::test]
async fn failed_ticker_does_not_abort_batch_and_order_is_preserved() {
    let pipeline = Pipeline::new(
        config_for(&["AAA", "BBB", "CCC"]),
        Arc::new(FakePriceFeed {
            fail_for: Some("BBB".to_string()),
            rows: 60,
        }),
        Arc::new(FakeNewsFeed {
            items: vec![],
            fail: false,
        }),
        None,
    );

    let results = pipeline.run().await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].ticker(), "AAA");
    assert_eq!(results[1].ticker(), "BBB");
    assert_eq!(results[2].ticker(), "CCC");
    assert!(!results[0].is_failure());
    assert!(results[1].is_failure());
    assert!(!results[2].is_failure());

    match &results[1] {
        TickerResult::Failed { error, .. } => assert!(error.contains("503")),
        _ => panic!("expected failure variant for BBB"),
    }
}

#[tokio::test]
async fn short_series_yields_insufficient_data_failure() {
    let pipeline = Pipeline::new(
        config_for(&["AAA"]),
        Arc::new(FakePriceFeed {
            fail_for: None,
            rows: 49,
        }),
        Arc::new(FakeNewsFeed {
            items: vec![],
            fail: false,
        }),
        None,
    );

    let results = pipeline.run().await;
    match &results[0] {
        TickerResult::Failed { error, .. } => {
            assert!(error.contains("Insufficient price data"))
        }
        _ => panic!("expected failure variant"),
    }
}

#[tokio::test]
async fn news_fetch_failure_is_absorbed_as_empty_news() {
    let pipeline = Pipeline::new(
        config_for(&["AAA"]),
        Arc::new(FakePriceFeed {
            fail_for: None,
            rows: 60,
        }),
        Arc::new(FakeNewsFeed {
            items: vec![],
            fail: true,
        }),
        None,
    );

    let results = pipeline.run().await;
    match &results[0] {
        TickerResult::Analyzed { news, .. } => assert!(news.is_empty()),
        _ => panic!("news failure must not fail the ticker"),
    }
}

#[tokio::test]
async fn missing_narrator_produces_exact_fallback_narrative() {
    // Monotonically rising closes: RSI pegs at 100, so the overbought rule
    // fires and nothing else does.
    let pipeline = Pipeline::new(
        config_for(&["AAA"]),
        Arc::new(FakePriceFeed {
            fail_for: None,
            rows: 60,
        }),
        Arc::new(FakeNewsFeed {
            items: vec![],
            fail: false,
        }),
        None,
    );

    let results = pipeline.run().await;
    match &results[0] {
        TickerResult::Analyzed { decision, .. } => {
            assert_eq!(decision.action.as_str(), "ESCALATE");
            assert_eq!(decision.reason, "RSI is overbought (>= 70).");
            assert_eq!(
                decision.narrative,
                "ESCALATE: RSI is overbought (>= 70). (no narrative available)."
            );
        }
        _ => panic!("expected success variant"),
    }
}

#[tokio::test]
async fn erroring_narrator_degrades_without_altering_decision() {
    let pipeline = Pipeline::new(
        config_for(&["AAA"]),
        Arc::new(FakePriceFeed {
            fail_for: None,
            rows: 60,
        }),
        Arc::new(FakeNewsFeed {
            items: vec![news_item("Stock crashes amid layoffs")],
            fail: false,
        }),
        Some(Arc::new(BrokenNarrator)),
    );

    let results = pipeline.run().await;
    match &results[0] {
        TickerResult::Analyzed { decision, news, .. } => {
            assert_eq!(decision.reason, "RSI is overbought (>= 70).");
            assert_eq!(
                decision.narrative,
                "ESCALATE: RSI is overbought (>= 70). (no narrative available)."
            );
            // Summary fell back to the raw (short) title verbatim
            assert_eq!(news[0].summary, "Stock crashes amid layoffs");
        }
        _ => panic!("expected success variant"),
    }
}

#[tokio::test]
async fn sentiment_derives_from_generated_summary_not_title() {
    // Negative headline, but the narrator's summary is positive: the score
    // must follow the summary.
    let pipeline = Pipeline::new(
        config_for(&["AAA"]),
        Arc::new(FakePriceFeed {
            fail_for: None,
            rows: 60,
        }),
        Arc::new(FakeNewsFeed {
            items: vec![news_item("Stock crashes amid layoffs and lawsuit fears")],
            fail: false,
        }),
        Some(Arc::new(FixedNarrator(
            "Record profit and strong growth expected.",
        ))),
    );

    let results = pipeline.run().await;
    match &results[0] {
        TickerResult::Analyzed { news, decision, .. } => {
            assert_eq!(news[0].summary, "Record profit and strong growth expected.");
            assert_eq!(news[0].sentiment_label, SentimentLabel::Positive);
            assert!(news[0].sentiment_score > 0.05);
            // Narrator present: narrative is the generated text
            assert_eq!(decision.narrative, "Record profit and strong growth expected.");
        }
        _ => panic!("expected success variant"),
    }
}

#[tokio::test]
async fn chart_renderer_output_is_attached_to_the_result() {
    let pipeline = Pipeline::new(
        config_for(&["AAA"]),
        Arc::new(FakePriceFeed {
            fail_for: None,
            rows: 60,
        }),
        Arc::new(FakeNewsFeed {
            items: vec![],
            fail: false,
        }),
        None,
    )
    .with_chart_renderer(Arc::new(FakeChartRenderer));

    let results = pipeline.run().await;
    match &results[0] {
        // 60 input rows leave 11 fully-populated indicator rows
        TickerResult::Analyzed { chart, .. } => {
            assert_eq!(chart.as_deref(), Some("chart:AAA:11"))
        }
        _ => panic!("expected success variant"),
    }
}

#[tokio::test]
async fn chart_renderer_failure_degrades_to_no_chart() {
    let pipeline = Pipeline::new(
        config_for(&["AAA"]),
        Arc::new(FakePriceFeed {
            fail_for: None,
            rows: 60,
        }),
        Arc::new(FakeNewsFeed {
            items: vec![],
            fail: false,
        }),
        None,
    )
    .with_chart_renderer(Arc::new(BrokenChartRenderer));

    let results = pipeline.run().await;
    match &results[0] {
        TickerResult::Analyzed { chart, decision, .. } => {
            assert!(chart.is_none());
            assert_eq!(decision.reason, "RSI is overbought (>= 70).");
        }
        _ => panic!("chart failure must not fail the ticker"),
    }
}

#[tokio::test]
async fn two_negative_articles_trigger_news_rule() {
    // Flat-ish data would be needed to isolate the news rule; here rising
    // closes also peg RSI, so both reasons appear in definition order.
    let pipeline = Pipeline::new(
        config_for(&["AAA"]),
        Arc::new(FakePriceFeed {
            fail_for: None,
            rows: 60,
        }),
        Arc::new(FakeNewsFeed {
            items: vec![
                news_item("Shares plunge on lawsuit and fraud probe concerns"),
                news_item("Weak outlook sparks selloff fears and heavy losses"),
            ],
            fail: false,
        }),
        None,
    );

    let results = pipeline.run().await;
    match &results[0] {
        TickerResult::Analyzed { decision, news, .. } => {
            assert_eq!(news.len(), 2);
            assert!(news.iter().all(|n| n.sentiment_score <= -0.2));
            assert_eq!(
                decision.reason,
                "RSI is overbought (>= 70). & High volume of negative news (2 articles)."
            );
        }
        _ => panic!("expected success variant"),
    }
}
