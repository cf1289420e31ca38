use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Runtime configuration, loaded once and passed explicitly into the
/// orchestrator. No stage reads the environment after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tickers to process, in request order
    pub tickers: Vec<String>,
    /// Days of price history to request from the price feed
    pub lookback_days: u32,
    /// Cap on raw news items per ticker
    pub max_news_items: usize,
    /// Bound on concurrently processed tickers
    pub max_concurrency: usize,
    /// Timeout applied to every external call
    pub request_timeout_seconds: u64,
    /// Groq API key; narrative generation is disabled when absent
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    /// Where the rendered HTML report is written
    pub report_path: String,
    /// Recipient for the external mailer collaborator (not used in-process)
    pub recipient_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env for local runs; env vars already set take precedence
        dotenv::dotenv().ok();

        let tickers: Vec<String> = env::var("WATCH_TICKERS")
            .unwrap_or_else(|_| "AMD,AVGO".to_string())
            .split(',')
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();

        if tickers.is_empty() {
            anyhow::bail!("WATCH_TICKERS must name at least one ticker");
        }

        Ok(Config {
            tickers,
            lookback_days: env::var("LOOKBACK_DAYS")
                .unwrap_or_else(|_| "365".to_string())
                .parse()
                .context("Invalid LOOKBACK_DAYS value")?,
            max_news_items: env::var("MAX_NEWS_ITEMS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid MAX_NEWS_ITEMS value")?,
            max_concurrency: env::var("MAX_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .context("Invalid MAX_CONCURRENCY value")?,
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECONDS value")?,
            groq_api_key: env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            groq_model: env::var("GROQ_MODEL").unwrap_or_else(|_| "llama3-8b-8192".to_string()),
            report_path: env::var("REPORT_PATH")
                .unwrap_or_else(|_| "report/stock_report.html".to_string()),
            recipient_email: env::var("RECIPIENT_EMAIL").ok().filter(|e| !e.is_empty()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tickers: vec!["AMD".to_string(), "AVGO".to_string()],
            lookback_days: 365,
            max_news_items: 5,
            max_concurrency: 4,
            request_timeout_seconds: 10,
            groq_api_key: None,
            groq_model: "llama3-8b-8192".to_string(),
            report_path: "report/stock_report.html".to_string(),
            recipient_email: None,
        }
    }
}
