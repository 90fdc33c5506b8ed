//! Command handlers: read files, decode, call the library, print

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::info;

use tradecheck::analysis::{analyze, AnalysisInput};
use tradecheck::config::Settings;
use tradecheck::importers::{decode_bytes, resolve_columns, SourceParser};
use tradecheck::models::{RawTable, Source};

use super::formatters;

/// Name used for the decoded table: the file name, which doubles as the
/// instrument identity for per-symbol trade histories
fn table_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read every file fully into memory before any parsing starts
async fn read_all(paths: &[PathBuf]) -> Result<Vec<(String, Vec<u8>)>> {
    let handles: Vec<JoinHandle<Result<(String, Vec<u8>)>>> = paths
        .iter()
        .cloned()
        .map(|path| {
            tokio::spawn(async move {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok((table_name(&path), bytes))
            })
        })
        .collect();

    let mut files = Vec::with_capacity(handles.len());
    for handle in handles {
        files.push(handle.await.context("File reader task failed")??);
    }
    Ok(files)
}

/// Decode with the source's schema locating the header; when no row satisfies
/// it, keep the first text row so parsing reports the missing column by name
fn decode_for(parser: &SourceParser, name: &str, bytes: &[u8]) -> Result<RawTable> {
    decode_bytes(name, bytes, Some(parser.schema()))
        .or_else(|_| decode_bytes(name, bytes, None))
        .with_context(|| format!("Failed to decode {} file {}", parser.source(), name))
}

pub async fn run_analyze(
    settings: &Settings,
    kite: &Path,
    tradingview: &[PathBuf],
    export: Option<&Path>,
    charts: Option<&Path>,
    json_output: bool,
) -> Result<()> {
    let mut paths = vec![kite.to_path_buf()];
    paths.extend(tradingview.iter().cloned());
    let mut files = read_all(&paths).await?.into_iter();

    let (kite_name, kite_bytes) = files
        .next()
        .ok_or_else(|| anyhow!("No Kite statement given"))?;

    let kite_parser = SourceParser::for_source(Source::Kite, settings);
    let tv_parser = SourceParser::for_source(Source::TradingView, settings);

    let input = AnalysisInput {
        brokerage: decode_for(&kite_parser, &kite_name, &kite_bytes)?,
        platform: files
            .map(|(name, bytes)| decode_for(&tv_parser, &name, &bytes))
            .collect::<Result<Vec<_>>>()?,
    };

    let result = analyze(&input, settings)?;

    if let Some(path) = export {
        let file = File::create(path)
            .with_context(|| format!("Failed to create export file {}", path.display()))?;
        result.write_export(&settings.nan_marker, BufWriter::new(file))?;
        info!("Wrote export to {}", path.display());
    }

    if let Some(path) = charts {
        let json = serde_json::to_string_pretty(&result.charts)
            .context("Failed to serialize charts")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write charts file {}", path.display()))?;
        info!("Wrote charts to {}", path.display());
    }

    if json_output {
        println!("{}", formatters::format_analysis_json(&result));
    } else {
        print!("{}", formatters::format_analysis_table(&result));
        if let Some(path) = export {
            println!("\n{} Export written to {}", "✓".green().bold(), path.display());
        }
        if let Some(path) = charts {
            println!("{} Charts written to {}", "✓".green().bold(), path.display());
        }
    }

    Ok(())
}

pub async fn run_columns(settings: &Settings, file: &Path, source: Source, json_output: bool) -> Result<()> {
    let (name, bytes) = read_all(&[file.to_path_buf()])
        .await?
        .pop()
        .ok_or_else(|| anyhow!("Nothing read from {}", file.display()))?;

    let parser = SourceParser::for_source(source, settings);
    let table = decode_for(&parser, &name, &bytes)?;
    let map = resolve_columns(&table.headers, parser.schema(), &table.name)?;

    if json_output {
        println!(
            "{}",
            formatters::format_columns_json(source, &table.name, parser.schema(), &map)
        );
    } else {
        print!(
            "{}",
            formatters::format_columns_table(source, &table.name, parser.schema(), &map)
        );
    }
    Ok(())
}
