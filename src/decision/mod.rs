//! Rule-based decision engine.
//! A pure evaluator over the latest indicator snapshot and the processed
//! news, plus an independent narrative step with its own fallback.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::{ProcessedNewsItem, TechSnapshot};
use crate::llm::Narrator;

// Alert thresholds are fixed constants, matching the rule texts below
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const NEGATIVE_NEWS_SCORE: f64 = -0.2;
const NEGATIVE_NEWS_COUNT: usize = 2;

const NO_TRIGGERS_REASON: &str = "No significant triggers met.";

const NARRATIVE_SYSTEM_PROMPT: &str = "You are an expert AI financial analyst. \
Provide a brief, balanced, and actionable synthesis of the provided technical and news data.";

/// Alert action emitted by the rule engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertAction {
    Escalate,
    Monitor,
}

impl AlertAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertAction::Escalate => "ESCALATE",
            AlertAction::Monitor => "MONITOR",
        }
    }
}

impl std::fmt::Display for AlertAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision for one ticker: rule-based action and reason, plus a
/// narrative that may be degraded without ever altering action/reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub action: AlertAction,
    pub reason: String,
    pub narrative: String,
}

/// Evaluate the alert rules in fixed definition order.
///
/// Pure and deterministic: identical inputs always yield identical
/// (action, reason). Reasons are joined with " & " in rule-definition
/// order, never fired-order. Absent snapshot fields never trigger and
/// never error.
pub fn decide(snapshot: &TechSnapshot, news: &[ProcessedNewsItem]) -> (AlertAction, String) {
    let mut reasons: Vec<String> = Vec::new();

    if snapshot.rsi_14.is_some_and(|rsi| rsi >= RSI_OVERBOUGHT) {
        reasons.push("RSI is overbought (>= 70).".to_string());
    }

    if snapshot.rsi_14.is_some_and(|rsi| rsi <= RSI_OVERSOLD) {
        reasons.push("RSI is oversold (<= 30).".to_string());
    }

    if let (Some(close), Some(sma_50)) = (snapshot.close, snapshot.sma_50) {
        if close < sma_50 {
            reasons.push("Price crossed below 50-day SMA.".to_string());
        }
    }

    let negative_count = news
        .iter()
        .filter(|item| item.sentiment_score <= NEGATIVE_NEWS_SCORE)
        .count();
    if negative_count >= NEGATIVE_NEWS_COUNT {
        reasons.push(format!(
            "High volume of negative news ({negative_count} articles)."
        ));
    }

    if reasons.is_empty() {
        (AlertAction::Monitor, NO_TRIGGERS_REASON.to_string())
    } else {
        (AlertAction::Escalate, reasons.join(" & "))
    }
}

/// Run the rules, then independently ask the narrator for an analyst
/// opinion. Narrative failure never alters or blocks action/reason.
pub async fn build_decision(
    ticker: &str,
    snapshot: &TechSnapshot,
    news: &[ProcessedNewsItem],
    narrator: Option<&dyn Narrator>,
) -> Decision {
    let (action, reason) = decide(snapshot, news);

    let narrative = match narrator {
        Some(narrator) => {
            let prompt = narrative_prompt(ticker, snapshot, news);
            match narrator.generate(NARRATIVE_SYSTEM_PROMPT, &prompt).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(ticker, error = %e, "Narrative generation failed, using fallback");
                    fallback_narrative(action, &reason)
                }
            }
        }
        None => fallback_narrative(action, &reason),
    };

    Decision {
        action,
        reason,
        narrative,
    }
}

fn fallback_narrative(action: AlertAction, reason: &str) -> String {
    format!("{action}: {reason} (no narrative available).")
}

fn narrative_prompt(ticker: &str, snapshot: &TechSnapshot, news: &[ProcessedNewsItem]) -> String {
    let fmt = |value: Option<f64>| match value {
        Some(v) => format!("{v:.2}"),
        None => "N/A".to_string(),
    };

    let mut prompt = format!(
        "Analyze the following data for the stock ticker {ticker} and provide \
a one-paragraph summary for an investor. Should I be concerned, optimistic, \
or just watchful? Explain why briefly.\n\n\
**Technical Data:**\n\
- Close Price: {}\n\
- 20-Day SMA: {}\n\
- 50-Day SMA: {}\n\
- RSI (14): {}\n\
- MACD Line: {}\n\n\
**Recent News Summaries:**\n",
        fmt(snapshot.close),
        fmt(snapshot.sma_20),
        fmt(snapshot.sma_50),
        fmt(snapshot.rsi_14),
        fmt(snapshot.macd),
    );

    for item in news {
        prompt.push_str(&format!("- ({}) {}\n", item.sentiment_label, item.summary));
    }

    prompt
}
