//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use tradecheck::analysis::{AnalysisResult, SourceReport};
use tradecheck::importers::{ColumnMap, Schema};
use tradecheck::models::{DeltaRecord, Source, StockSummary};
use tradecheck::utils::{format_amount, format_currency, format_percent};

fn signed_amount(value: Decimal) -> String {
    let text = format_amount(value);
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn signed_percent(value: Option<Decimal>) -> String {
    let text = format_percent(value);
    match value {
        Some(pct) if pct >= Decimal::ZERO => text.green().to_string(),
        Some(_) => text.red().to_string(),
        None => text.dimmed().to_string(),
    }
}

/// Format a full analysis for JSON output
pub fn format_analysis_json(result: &AnalysisResult) -> String {
    serde_json::to_string_pretty(result)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Format a full analysis for terminal table output
pub fn format_analysis_table(result: &AnalysisResult) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{} Kite vs TradingView Reconciliation\n\n",
        "📊".cyan().bold()
    ));
    output.push_str(&format_source_stats(&[&result.kite, &result.tradingview]));

    for report in [&result.kite, &result.tradingview] {
        output.push_str(&format_rankings(report));
    }

    output.push_str(&format_deltas(result));

    if !result.warnings.is_empty() {
        output.push_str(&format!("\n\n{} Warnings\n", "⚠".yellow().bold()));
        for warning in &result.warnings {
            output.push_str(&format!("  - {}\n", warning));
        }
    }

    output
}

fn format_source_stats(reports: &[&SourceReport]) -> String {
    #[derive(Tabled)]
    struct StatsRow {
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "Symbols")]
        symbols: usize,
        #[tabled(rename = "Buy Value")]
        buy_value: String,
        #[tabled(rename = "Sell Value")]
        sell_value: String,
        #[tabled(rename = "Realized P&L")]
        pnl: String,
        #[tabled(rename = "Avg Return %")]
        avg_return: String,
    }

    let rows: Vec<StatsRow> = reports
        .iter()
        .map(|r| StatsRow {
            source: r.source.to_string(),
            symbols: r.stats.symbol_count,
            buy_value: format_amount(r.stats.total_buy_value),
            sell_value: format_amount(r.stats.total_sell_value),
            pnl: signed_amount(r.stats.total_pnl),
            avg_return: signed_percent(r.stats.avg_pnl_pct),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    table.to_string()
}

fn format_rankings(report: &SourceReport) -> String {
    #[derive(Tabled)]
    struct RankRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Realized P&L")]
        pnl: String,
        #[tabled(rename = "Return %")]
        pct: String,
    }

    let to_rows = |summaries: &[StockSummary]| -> Vec<RankRow> {
        summaries
            .iter()
            .map(|s| RankRow {
                symbol: s.symbol.to_string(),
                pnl: signed_amount(s.realized_pnl),
                pct: signed_percent(s.realized_pnl_pct),
            })
            .collect()
    };

    let mut output = String::new();
    for (label, summaries) in [("Top performers", &report.top), ("Bottom performers", &report.bottom)] {
        if summaries.is_empty() {
            continue;
        }
        let mut table = Table::new(to_rows(summaries.as_slice()));
        table.with(Style::rounded());
        table.modify(Columns::new(1..), Alignment::right());
        output.push_str(&format!(
            "\n\n{} {} - {}\n",
            "▸".cyan(),
            report.source.to_string().bold(),
            label
        ));
        output.push_str(&table.to_string());
    }
    output
}

fn format_deltas(result: &AnalysisResult) -> String {
    #[derive(Tabled)]
    struct DeltaRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Kite P&L")]
        kite: String,
        #[tabled(rename = "TradingView P&L")]
        tradingview: String,
        #[tabled(rename = "Delta")]
        delta: String,
        #[tabled(rename = "Delta %")]
        delta_pct: String,
    }

    let mut output = format!("\n\n{} Deltas (Kite - TradingView)\n", "Δ".cyan().bold());

    if result.deltas.is_empty() {
        output.push_str(&format!(
            "{} No symbols are common to both sources\n",
            "ℹ".blue().bold()
        ));
    } else {
        let rows: Vec<DeltaRow> = result
            .delta_stats
            .ranked
            .iter()
            .map(|d: &DeltaRecord| DeltaRow {
                symbol: d.symbol.to_string(),
                kite: format_amount(d.kite_pnl),
                tradingview: format_amount(d.tradingview_pnl),
                delta: signed_amount(d.delta),
                delta_pct: signed_percent(d.delta_pct),
            })
            .collect();

        let mut table = Table::new(&rows);
        table.with(Style::rounded());
        table.modify(Columns::new(1..), Alignment::right());
        output.push_str(&table.to_string());

        if result.deltas.len() > rows.len() {
            output.push_str(&format!(
                "\n{} more symbol(s) in the export",
                result.deltas.len() - rows.len()
            ));
        }
    }

    output.push_str(&format!("\n\n{} Summary", "━".repeat(60).bright_black()));
    output.push_str(&format!(
        "\n{:<22} {}",
        "Total Delta:".bold(),
        format_currency(result.delta_stats.total_delta)
    ));
    if let Some(largest) = &result.delta_stats.largest_delta {
        output.push_str(&format!(
            "\n{:<22} {} ({})",
            "Largest Delta:".bold(),
            format_currency(largest.delta),
            largest.symbol
        ));
    }

    let list = |symbols: &[tradecheck::models::SymbolKey]| -> String {
        if symbols.is_empty() {
            "-".to_string()
        } else {
            symbols.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        }
    };
    output.push_str(&format!(
        "\n{:<22} {}",
        "Only in Kite:".bold(),
        list(result.unmatched.kite_only.as_slice())
    ));
    output.push_str(&format!(
        "\n{:<22} {}\n",
        "Only in TradingView:".bold(),
        list(result.unmatched.tradingview_only.as_slice())
    ));

    output
}

#[derive(Serialize)]
struct ColumnBinding {
    field: String,
    required: bool,
    header: Option<String>,
}

fn column_bindings(schema: &Schema, map: &ColumnMap) -> Vec<ColumnBinding> {
    schema
        .fields
        .iter()
        .map(|spec| ColumnBinding {
            field: spec.field.to_string(),
            required: spec.required,
            header: map.header_for(spec.field).map(str::to_string),
        })
        .collect()
}

pub fn format_columns_json(source: Source, table_name: &str, schema: &Schema, map: &ColumnMap) -> String {
    #[derive(Serialize)]
    struct JsonColumns<'a> {
        source: Source,
        file: &'a str,
        columns: Vec<ColumnBinding>,
    }

    serde_json::to_string_pretty(&JsonColumns {
        source,
        file: table_name,
        columns: column_bindings(schema, map),
    })
    .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Show which header each canonical field bound to
pub fn format_columns_table(source: Source, table_name: &str, schema: &Schema, map: &ColumnMap) -> String {
    #[derive(Tabled)]
    struct BindingRow {
        #[tabled(rename = "Field")]
        field: String,
        #[tabled(rename = "Required")]
        required: String,
        #[tabled(rename = "Header")]
        header: String,
    }

    let rows: Vec<BindingRow> = column_bindings(schema, map)
        .into_iter()
        .map(|b| BindingRow {
            field: b.field,
            required: if b.required { "yes".to_string() } else { String::new() },
            header: match b.header {
                Some(h) => format!("{} {}", "✓".green(), h),
                None => "-".dimmed().to_string(),
            },
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());

    format!(
        "\n{} {} columns in {}\n\n{}\n",
        "🔎".cyan().bold(),
        source,
        table_name,
        table
    )
}
