use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;

pub mod commands;

#[derive(Parser)]
#[command(
    name = "stockwatch",
    about = "Daily stock watcher: technical indicators + news sentiment fused into rule-based alerts",
    version = "0.1.0"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline for the watchlist and write the HTML report
    Run {
        /// Comma-separated tickers overriding the configured watchlist
        #[arg(short, long)]
        tickers: Option<String>,

        /// Report output path override
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Analyze a single ticker and print the result as JSON
    Analyze {
        /// Ticker to analyze
        #[arg(short = 's', long, default_value = "AMD")]
        ticker: String,
    },
}

/// Execute the parsed CLI command against the loaded configuration.
pub async fn run(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Run { tickers, output } => {
            if let Some(list) = tickers {
                config.tickers = list
                    .split(',')
                    .map(|t| t.trim().to_uppercase())
                    .filter(|t| !t.is_empty())
                    .collect();
                if config.tickers.is_empty() {
                    anyhow::bail!("--tickers must name at least one ticker");
                }
            }
            if let Some(path) = output {
                config.report_path = path;
            }
            commands::run_report(config).await
        }
        Commands::Analyze { ticker } => commands::analyze_ticker(config, &ticker).await,
    }
}
