//! HTML report rendering.
//! A narrow collaborator surface: pure string rendering from the ordered
//! result list, plus a file sink. Delivery (email) stays external.

use std::fs;
use std::path::Path;
use tracing::info;

use crate::data::SentimentLabel;
use crate::orchestrator::TickerResult;

/// Render the daily report for an ordered batch of ticker results.
/// Handles both the success and failure variant of every result.
pub fn render_html_report(results: &[TickerResult]) -> String {
    let mut sections = String::new();
    for result in results {
        match result {
            TickerResult::Analyzed {
                ticker,
                snapshot,
                news,
                decision,
                chart,
            } => {
                let news_html = if news.is_empty() {
                    "<p>No recent news found.</p>".to_string()
                } else {
                    let mut table = String::from(
                        r#"<table class="news-table"><tr><th>Headline</th><th>Summary</th><th>Sentiment</th><th>Source</th></tr>"#,
                    );
                    for article in news {
                        let color = match article.sentiment_label {
                            SentimentLabel::Negative => "color: #ff4d4d;",
                            SentimentLabel::Positive => "color: #4caf50;",
                            SentimentLabel::Neutral => "",
                        };
                        table.push_str(&format!(
                            r#"<tr><td><a href="{}">{}</a></td><td>{}</td><td style="{}">{} ({:.2})</td><td>{}</td></tr>"#,
                            escape(&article.link),
                            escape(&article.headline),
                            escape(&article.summary),
                            color,
                            article.sentiment_label,
                            article.sentiment_score,
                            escape(&article.source),
                        ));
                    }
                    table.push_str("</table>");
                    table
                };

                let chart_html = match chart {
                    Some(blob) => format!(
                        r#"<img src="data:image/png;base64,{blob}" alt="{} chart" style="width:100%; max-width:700px;">"#,
                        escape(ticker)
                    ),
                    None => String::new(),
                };

                let fmt = |value: Option<f64>| match value {
                    Some(v) => format!("{v:.2}"),
                    None => "N/A".to_string(),
                };

                sections.push_str(&format!(
                    r#"<details open>
<summary><h2>{ticker} - Daily Report</h2></summary>
<div class="ticker-section">
<h3>Analyst Opinion</h3>
<p class="analyst-opinion">{narrative}</p>
<p><b>Action Triggered:</b> {action} ({reason})</p>
<h3>Technical Summary</h3>
<p><b>Close:</b> ${close} | <b>SMA20:</b> ${sma20} | <b>SMA50:</b> ${sma50} | <b>RSI:</b> {rsi}</p>
{chart_html}
<h3>Recent News</h3>
{news_html}
</div>
</details>
"#,
                    ticker = escape(ticker),
                    narrative = escape(&decision.narrative),
                    action = decision.action,
                    reason = escape(&decision.reason),
                    close = fmt(snapshot.close),
                    sma20 = fmt(snapshot.sma_20),
                    sma50 = fmt(snapshot.sma_50),
                    rsi = fmt(snapshot.rsi_14),
                ));
            }
            TickerResult::Failed { ticker, error } => {
                sections.push_str(&format!(
                    r#"<details open>
<summary><h2>{ticker} - Processing Failed</h2></summary>
<div class="ticker-section">
<p class="error">Could not process {ticker}: {error}</p>
</div>
</details>
"#,
                    ticker = escape(ticker),
                    error = escape(error),
                ));
            }
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<style>
    body {{ font-family: Arial, sans-serif; margin: 20px; color: #333; }}
    .container {{ max-width: 800px; margin: auto; border: 1px solid #ddd; padding: 20px; border-radius: 8px; }}
    h2 {{ color: #34495e; border-bottom: 2px solid #3498db; padding-bottom: 5px; }}
    details {{ border: 1px solid #ddd; border-radius: 4px; margin-bottom: 15px; }}
    summary {{ font-size: 1.2em; font-weight: bold; padding: 10px; cursor: pointer; background-color: #f2f2f2; }}
    .ticker-section {{ padding: 10px; }}
    .analyst-opinion {{ background-color: #eaf2f8; border-left: 4px solid #3498db; padding: 10px; margin: 10px 0; }}
    .error {{ color: #ff4d4d; }}
    .news-table {{ width: 100%; border-collapse: collapse; }}
    .news-table th, .news-table td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
    .news-table th {{ background-color: #f2f2f2; }}
</style>
</head>
<body>
<div class="container">
<h1>Daily Stock Watcher Report</h1>
{sections}
</div>
</body>
</html>
"#
    )
}

/// Write the rendered report to disk, creating parent directories.
pub fn write_report(path: &str, html: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html)?;
    info!(path, "Report written");
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
