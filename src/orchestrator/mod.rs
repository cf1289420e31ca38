//! Pipeline orchestrator.
//! Sequences ingestion, indicators, sentiment, and decision per ticker,
//! isolates per-ticker failures at the ticker boundary, and assembles a
//! uniform result record for every requested ticker in request order.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::data::{
    compute_indicators, process_articles, IndicatorSeries, NewsFeed, PipelineResult, PriceFeed,
    ProcessedNewsItem, TechSnapshot,
};
use crate::decision::{build_decision, Decision};
use crate::llm::Narrator;

/// Optional chart rendering capability. Returns a base64-encoded image
/// blob; absence or failure degrades to no chart, never fails the ticker.
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, indicators: &IndicatorSeries) -> PipelineResult<String>;
}

/// Per-ticker outcome: mutually exclusive variants, never partially
/// populated, immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickerResult {
    Analyzed {
        ticker: String,
        snapshot: TechSnapshot,
        news: Vec<ProcessedNewsItem>,
        decision: Decision,
        chart: Option<String>,
    },
    Failed {
        ticker: String,
        error: String,
    },
}

impl TickerResult {
    pub fn ticker(&self) -> &str {
        match self {
            TickerResult::Analyzed { ticker, .. } => ticker,
            TickerResult::Failed { ticker, .. } => ticker,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TickerResult::Failed { .. })
    }
}

/// Per-ticker analysis pipeline over collaborator ports.
///
/// Per-ticker runs share no mutable state; the narrative capability is
/// resolved once at construction and queried nowhere else.
pub struct Pipeline {
    config: Config,
    price_feed: Arc<dyn PriceFeed>,
    news_feed: Arc<dyn NewsFeed>,
    narrator: Option<Arc<dyn Narrator>>,
    chart_renderer: Option<Arc<dyn ChartRenderer>>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        price_feed: Arc<dyn PriceFeed>,
        news_feed: Arc<dyn NewsFeed>,
        narrator: Option<Arc<dyn Narrator>>,
    ) -> Self {
        Self {
            config,
            price_feed,
            news_feed,
            narrator,
            chart_renderer: None,
        }
    }

    pub fn with_chart_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.chart_renderer = Some(renderer);
        self
    }

    /// Process the configured ticker list as a bounded concurrent map.
    /// Results come back one per ticker, in request order, regardless of
    /// which tickers failed.
    pub async fn run(&self) -> Vec<TickerResult> {
        let tickers = self.config.tickers.clone();
        let limit = self.config.max_concurrency.max(1);
        info!(count = tickers.len(), limit, "Starting pipeline run");

        let results: Vec<TickerResult> = stream::iter(tickers)
            .map(|ticker| async move { self.process_ticker(&ticker).await })
            .buffered(limit)
            .collect()
            .await;

        let failures = results.iter().filter(|r| r.is_failure()).count();
        info!(
            total = results.len(),
            failures, "Pipeline run complete"
        );
        results
    }

    /// Run one ticker's pipeline, converting any stage failure into the
    /// failure variant at this boundary. The batch is never aborted.
    pub async fn process_ticker(&self, ticker: &str) -> TickerResult {
        match self.analyze(ticker).await {
            Ok(result) => result,
            Err(e) => {
                error!(ticker, error = %e, "Ticker pipeline failed");
                TickerResult::Failed {
                    ticker: ticker.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn analyze(&self, ticker: &str) -> PipelineResult<TickerResult> {
        // Price fetch failure is fatal for this ticker
        let series = self
            .price_feed
            .fetch_history(ticker, self.config.lookback_days)
            .await?;

        // News fetch failure is absorbed as an empty list
        let raw_news = match self
            .news_feed
            .fetch_news(ticker, self.config.max_news_items)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!(ticker, error = %e, "News fetch failed, continuing with empty news");
                Vec::new()
            }
        };

        let indicators = compute_indicators(&series)?;
        let snapshot = indicators.snapshot();

        let narrator = self.narrator.as_deref();
        let news = process_articles(&raw_news, narrator).await;
        let decision = build_decision(ticker, &snapshot, &news, narrator).await;

        let chart = match &self.chart_renderer {
            Some(renderer) => match renderer.render(&indicators).await {
                Ok(blob) => Some(blob),
                Err(e) => {
                    warn!(ticker, error = %e, "Chart rendering failed, continuing without chart");
                    None
                }
            },
            None => None,
        };

        info!(
            ticker,
            action = decision.action.as_str(),
            news_count = news.len(),
            "Ticker analysis complete"
        );

        Ok(TickerResult::Analyzed {
            ticker: ticker.to_string(),
            snapshot,
            news,
            decision,
            chart,
        })
    }
}
