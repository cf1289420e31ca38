// stockwatch - Daily Stock Watcher
// Ingests per-ticker price history and news, derives technical indicators,
// fuses them with sentiment-scored news into a deterministic rule-based
// alert decision, and optionally augments it with a generated narrative.

#![deny(clippy::unwrap_used)]

pub mod cli;
pub mod config;
pub mod data;
pub mod decision;
pub mod llm;
pub mod orchestrator;
pub mod report;

// Re-export commonly used items
pub use config::Config;
pub use data::{NewsItem, PipelineError, PriceBar, PriceSeries, ProcessedNewsItem, TechSnapshot};
pub use decision::{AlertAction, Decision};
pub use orchestrator::{Pipeline, TickerResult};
