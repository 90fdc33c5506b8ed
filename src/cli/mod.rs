use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use tradecheck::models::Source;

pub mod formatters;
pub mod runner;

#[derive(Parser)]
#[command(name = "tradecheck")]
#[command(
    version,
    about = "Reconcile Kite P&L statements against TradingView trade histories"
)]
#[command(
    long_about = "Parse a Kite P&L statement and per-symbol TradingView trade histories, compute realized P&L for each, and report per-symbol deltas, rankings and chart data."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Settings file (defaults to $XDG_CONFIG_HOME/tradecheck/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a Kite statement with TradingView trade histories
    Analyze {
        /// Kite P&L statement (.csv, .xlsx, .xls)
        #[arg(long)]
        kite: PathBuf,

        /// TradingView trade history, one file per symbol
        #[arg(long = "tradingview", required = true, num_args = 1..)]
        tradingview: Vec<PathBuf>,

        /// Write the per-symbol delta table as CSV
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write chart descriptors as JSON
        #[arg(long)]
        charts: Option<PathBuf>,
    },

    /// Show how a file's headers resolve to canonical columns
    Columns {
        /// Path to the CSV or Excel file
        file: PathBuf,

        /// Which source's columns to resolve (kite or tradingview)
        #[arg(long, default_value = "kite", value_parser = parse_source)]
        source: Source,
    },
}

fn parse_source(value: &str) -> Result<Source, String> {
    Source::from_str(value)
        .map_err(|_| format!("unknown source '{}', expected kite or tradingview", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_accepts_many_histories() {
        let cli = Cli::try_parse_from([
            "tradecheck",
            "analyze",
            "--kite",
            "pnl.xlsx",
            "--tradingview",
            "INFY.csv",
            "TCS.csv",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Analyze { tradingview, .. } => assert_eq!(tradingview.len(), 2),
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_columns_source_parsing() {
        let cli =
            Cli::try_parse_from(["tradecheck", "columns", "a.csv", "--source", "tv"]).unwrap();
        match cli.command {
            Commands::Columns { source, .. } => assert_eq!(source, Source::TradingView),
            _ => panic!("expected columns"),
        }
        assert!(Cli::try_parse_from(["tradecheck", "columns", "a.csv", "--source", "x"]).is_err());
    }
}
