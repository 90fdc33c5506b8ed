mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{runner, Cli, Commands};
use tracing_subscriber::EnvFilter;

use tradecheck::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            kite,
            tradingview,
            export,
            charts,
        } => {
            runner::run_analyze(
                &settings,
                &kite,
                &tradingview,
                export.as_deref(),
                charts.as_deref(),
                cli.json,
            )
            .await
        }
        Commands::Columns { file, source } => {
            runner::run_columns(&settings, &file, source, cli.json).await
        }
    }
}
