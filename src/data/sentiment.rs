//! Sentiment engine.
//! Summarizes raw news items through the narrative collaborator (degrading
//! to a truncated headline when it is unavailable) and scores the summary
//! with a deterministic lexicon-based compound score.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{NewsItem, ProcessedNewsItem};
use crate::llm::Narrator;

/// Label thresholds on the compound score (boundary-inclusive)
pub const POSITIVE_THRESHOLD: f64 = 0.05;
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

const SUMMARY_FALLBACK_MAX_CHARS: usize = 300;

const SUMMARY_SYSTEM_PROMPT: &str = "You are a financial news analyst. \
Summarize the following article for an investor in 2-3 concise sentences. \
Focus on the key facts, figures, and potential market impact. Ignore boilerplate text.";

/// Lexicon of positive financial words
const POSITIVE_WORDS: &[&str] = &[
    "gain", "gains", "surge", "surges", "rally", "rallies", "jump", "jumps",
    "rise", "rises", "bull", "bullish", "strong", "beat", "beats", "upgrade",
    "upgrades", "record", "profit", "profits", "growth", "soar", "soars",
    "optimistic", "outperform", "positive", "breakout", "rebound", "upbeat",
];

/// Lexicon of negative financial words
const NEGATIVE_WORDS: &[&str] = &[
    "fall", "falls", "drop", "drops", "crash", "crashes", "decline",
    "declines", "bear", "bearish", "weak", "miss", "misses", "downgrade",
    "downgrades", "loss", "losses", "lawsuit", "plunge", "plunges", "layoff",
    "layoffs", "concern", "concerns", "fear", "fears", "warning", "recall",
    "fraud", "probe", "selloff", "slump", "negative", "cut", "cuts",
];

/// Negation tokens that flip the valence of the following word
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "without", "isn't", "wasn't", "aren't", "don't",
    "doesn't", "didn't", "won't", "can't", "cannot",
];

/// Sentiment classification of a processed news item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic compound sentiment score in [-1, 1].
///
/// Whole-token lexicon matches after lowercasing and punctuation trimming,
/// with a single-step negation flip, normalized VADER-style so the score
/// saturates toward +/-1 as hits accumulate.
pub fn compound_score(text: &str) -> f64 {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
        })
        .collect();

    let mut valence: f64 = 0.0;
    for (i, token) in tokens.iter().enumerate() {
        let hit = if POSITIVE_WORDS.contains(&token.as_str()) {
            1.0
        } else if NEGATIVE_WORDS.contains(&token.as_str()) {
            -1.0
        } else {
            continue;
        };

        let negated = i > 0 && NEGATIONS.contains(&tokens[i - 1].as_str());
        valence += if negated { -hit } else { hit };
    }

    valence / (valence * valence + 15.0).sqrt()
}

/// Classify a compound score into a label.
pub fn classify(score: f64) -> SentimentLabel {
    if score >= POSITIVE_THRESHOLD {
        SentimentLabel::Positive
    } else if score <= NEGATIVE_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Summarize and score a single news item.
///
/// The sentiment score always derives from the summary text, never from
/// the raw title once a summary exists.
pub async fn process_article(
    item: &NewsItem,
    narrator: Option<&dyn Narrator>,
) -> ProcessedNewsItem {
    let summary = match narrator {
        Some(narrator) => match narrator.generate(SUMMARY_SYSTEM_PROMPT, &item.title).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Summary generation failed, falling back to headline");
                fallback_summary(&item.title)
            }
        },
        None => fallback_summary(&item.title),
    };

    let score = compound_score(&summary);
    ProcessedNewsItem {
        headline: item.title.clone(),
        link: item.link.clone(),
        source: item.source.clone(),
        summary,
        sentiment_score: score,
        sentiment_label: classify(score),
    }
}

/// Process a batch of news items independently, preserving input order.
/// No deduplication and no cross-item aggregation at this stage.
pub async fn process_articles(
    items: &[NewsItem],
    narrator: Option<&dyn Narrator>,
) -> Vec<ProcessedNewsItem> {
    let mut processed = Vec::with_capacity(items.len());
    for item in items {
        processed.push(process_article(item, narrator).await);
    }
    processed
}

/// Degraded summary: the raw title truncated to 300 chars, with a trailing
/// ellipsis marker only when truncation happened.
fn fallback_summary(title: &str) -> String {
    if title.chars().count() <= SUMMARY_FALLBACK_MAX_CHARS {
        return title.to_string();
    }
    let truncated: String = title.chars().take(SUMMARY_FALLBACK_MAX_CHARS).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(0.05), SentimentLabel::Positive);
        assert_eq!(classify(-0.05), SentimentLabel::Negative);
        assert_eq!(classify(0.0), SentimentLabel::Neutral);
        assert_eq!(classify(0.049), SentimentLabel::Neutral);
        assert_eq!(classify(-0.049), SentimentLabel::Neutral);
    }

    #[test]
    fn test_compound_score_polarity() {
        let positive = compound_score("Shares surge on record profit and strong growth");
        let negative = compound_score("Stock plunges amid lawsuit fears and weak outlook");
        assert!(positive > 0.05);
        assert!(negative < -0.05);
        assert!((-1.0..=1.0).contains(&positive));
        assert!((-1.0..=1.0).contains(&negative));
    }

    #[test]
    fn test_compound_score_negation_flip() {
        let plain = compound_score("earnings were strong");
        let negated = compound_score("earnings were not strong");
        assert!(plain > 0.0);
        assert!(negated < 0.0);
    }

    #[test]
    fn test_compound_score_is_deterministic() {
        let text = "Analysts see growth but warn of decline risks";
        assert_eq!(compound_score(text), compound_score(text));
    }

    #[test]
    fn test_compound_score_neutral_text() {
        assert_eq!(compound_score("Company schedules annual meeting"), 0.0);
    }

    #[test]
    fn test_fallback_summary_truncates_at_300() {
        let long_title = "x".repeat(450);
        let summary = fallback_summary(&long_title);
        assert_eq!(summary.chars().count(), 303);
        assert!(summary.ends_with("..."));

        let short_title = "Chipmaker beats estimates";
        assert_eq!(fallback_summary(short_title), short_title);
    }

    #[tokio::test]
    async fn test_process_articles_preserves_order_without_narrator() {
        let items = vec![
            NewsItem {
                title: "First headline with strong gains".into(),
                link: "https://example.com/1".into(),
                source: "Test".into(),
            },
            NewsItem {
                title: "Second headline with heavy losses".into(),
                link: "https://example.com/2".into(),
                source: "Test".into(),
            },
        ];

        let processed = process_articles(&items, None).await;
        assert_eq!(processed.len(), 2);
        assert_eq!(processed[0].headline, items[0].title);
        assert_eq!(processed[1].headline, items[1].title);
        // No narrator: summary is the (short) title verbatim
        assert_eq!(processed[0].summary, items[0].title);
        assert_eq!(processed[0].sentiment_label, SentimentLabel::Positive);
        assert_eq!(processed[1].sentiment_label, SentimentLabel::Negative);
    }
}
