//! Flat delta table: the downloadable summary artifact
//!
//! Columns are fixed (`Symbol, Kite_PnL, TradingView_PnL, Delta, Delta_Pct`),
//! values carry two decimals and an undefined percentage is written as a
//! marker string so it can never be mistaken for zero.

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::str::FromStr;

use crate::models::{DeltaRecord, SymbolKey};

pub const EXPORT_HEADERS: [&str; 5] = ["Symbol", "Kite_PnL", "TradingView_PnL", "Delta", "Delta_Pct"];

/// One rendered row of the export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Kite_PnL")]
    pub kite_pnl: String,
    #[serde(rename = "TradingView_PnL")]
    pub tradingview_pnl: String,
    #[serde(rename = "Delta")]
    pub delta: String,
    #[serde(rename = "Delta_Pct")]
    pub delta_pct: String,
}

fn two_decimals(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

pub fn to_flat_table(deltas: &[DeltaRecord], nan_marker: &str) -> Vec<FlatRow> {
    deltas
        .iter()
        .map(|d| FlatRow {
            symbol: d.symbol.to_string(),
            kite_pnl: two_decimals(d.kite_pnl),
            tradingview_pnl: two_decimals(d.tradingview_pnl),
            delta: two_decimals(d.delta),
            delta_pct: d
                .delta_pct
                .map(two_decimals)
                .unwrap_or_else(|| nan_marker.trim().to_string()),
        })
        .collect()
}

/// Write rows as CSV with a header line
pub fn write_flat_table<W: Write>(rows: &[FlatRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        // serialize() only emits headers alongside the first record
        csv_writer
            .write_record(EXPORT_HEADERS)
            .context("Failed to write export header")?;
    }
    for row in rows {
        csv_writer
            .serialize(row)
            .with_context(|| format!("Failed to write export row for {}", row.symbol))?;
    }
    csv_writer.flush().context("Failed to flush export")?;
    Ok(())
}

/// Read a previously written export back into delta records
pub fn read_flat_table<R: Read>(reader: R, nan_marker: &str) -> Result<Vec<DeltaRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for (idx, result) in csv_reader.deserialize::<FlatRow>().enumerate() {
        let row = result.with_context(|| format!("Invalid export row {}", idx + 1))?;
        let line = idx + 1;

        let symbol = SymbolKey::new(&row.symbol)
            .ok_or_else(|| anyhow!("Export row {} has an empty symbol", line))?;
        let parse = |field: &str, value: &str| {
            Decimal::from_str(value.trim())
                .with_context(|| format!("Export row {}: invalid {} '{}'", line, field, value))
        };

        let delta_pct = if row.delta_pct.trim() == nan_marker.trim() {
            None
        } else {
            Some(parse("Delta_Pct", &row.delta_pct)?)
        };

        records.push(DeltaRecord {
            symbol,
            kite_pnl: parse("Kite_PnL", &row.kite_pnl)?,
            tradingview_pnl: parse("TradingView_PnL", &row.tradingview_pnl)?,
            delta: parse("Delta", &row.delta)?,
            delta_pct,
        });
    }

    Ok(records)
}
