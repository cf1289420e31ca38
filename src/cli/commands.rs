//! CLI command handlers: collaborator wiring and report output.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::data::{GoogleNewsClient, YahooChartClient};
use crate::llm::{GroqClient, Narrator};
use crate::orchestrator::{Pipeline, TickerResult};
use crate::report;

/// Wire the concrete collaborators into a pipeline. The narrative
/// capability is resolved exactly once, here.
fn build_pipeline(config: Config) -> Result<Pipeline> {
    let timeout = config.request_timeout_seconds;
    let price_feed = Arc::new(YahooChartClient::new(timeout)?);
    let news_feed = Arc::new(GoogleNewsClient::new(timeout)?);
    let narrator: Option<Arc<dyn Narrator>> =
        GroqClient::from_config(&config)?.map(|client| Arc::new(client) as Arc<dyn Narrator>);

    Ok(Pipeline::new(config, price_feed, news_feed, narrator))
}

/// Run the full batch and write the HTML report.
///
/// Individual ticker failures are reported inside the result list; the
/// process still exits successfully.
pub async fn run_report(config: Config) -> Result<()> {
    let report_path = config.report_path.clone();
    let pipeline = build_pipeline(config)?;

    let results = pipeline.run().await;

    for result in &results {
        match result {
            TickerResult::Analyzed { ticker, decision, .. } => {
                info!(ticker, action = decision.action.as_str(), reason = %decision.reason, "Decision");
            }
            TickerResult::Failed { ticker, error } => {
                warn!(ticker, error = %error, "Ticker failed");
            }
        }
    }

    let html = report::render_html_report(&results);
    report::write_report(&report_path, &html)?;
    println!("Report written to {report_path}");
    Ok(())
}

/// Analyze one ticker and print the full result record as JSON.
pub async fn analyze_ticker(mut config: Config, ticker: &str) -> Result<()> {
    config.tickers = vec![ticker.trim().to_uppercase()];
    let pipeline = build_pipeline(config)?;

    let results = pipeline.run().await;
    for result in &results {
        println!("{}", serde_json::to_string_pretty(result)?);
    }
    Ok(())
}
