//! One analysis run: parse both sources, reconcile, aggregate, chart
//!
//! A run either produces a complete `AnalysisResult` or fails with the first
//! fatal `ReconcileError`; there is no partial result.

use serde::Serialize;
use std::io::Write;
use tracing::info;

use crate::config::Settings;
use crate::error::{Result, Warning};
use crate::importers::{ParsedSource, SourceParser};
use crate::models::{DeltaRecord, RawTable, Source, StockSummary, SummaryMap};
use crate::reconcile::{reconcile, Unmatched};
use crate::reports::charts::{build_charts, Charts};
use crate::reports::export::{to_flat_table, write_flat_table, FlatRow};
use crate::reports::summary::{
    delta_stats, distribution, rank, rank_by_magnitude, scatter, source_stats, DeltaStats,
    Distribution, ScatterPoint, SourceStats,
};

/// Decoded tables for one run
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    /// The brokerage P&L statement
    pub brokerage: RawTable,
    /// One trade history per instrument
    pub platform: Vec<RawTable>,
}

/// Everything computed for one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: Source,
    pub stats: SourceStats,
    pub top: Vec<StockSummary>,
    pub bottom: Vec<StockSummary>,
    pub distribution: Distribution,
    pub scatter: Vec<ScatterPoint>,
    pub summaries: SummaryMap,
}

impl SourceReport {
    fn build(source: Source, summaries: SummaryMap, settings: &Settings) -> Self {
        let rankings = rank(&summaries, settings.ranking_size);
        Self {
            source,
            stats: source_stats(&summaries),
            top: rankings.top,
            bottom: rankings.bottom,
            distribution: distribution(&summaries),
            scatter: scatter(&summaries),
            summaries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub kite: SourceReport,
    pub tradingview: SourceReport,
    /// Per common symbol, in brokerage input order
    pub deltas: Vec<DeltaRecord>,
    pub delta_stats: DeltaStats,
    pub unmatched: Unmatched,
    pub charts: Charts,
    pub warnings: Vec<Warning>,
}

impl AnalysisResult {
    /// Export rows, largest |delta| first
    pub fn flat_table(&self, nan_marker: &str) -> Vec<FlatRow> {
        to_flat_table(&rank_by_magnitude(&self.deltas), nan_marker)
    }

    pub fn write_export<W: Write>(&self, nan_marker: &str, writer: W) -> anyhow::Result<()> {
        write_flat_table(&self.flat_table(nan_marker), writer)
    }
}

pub fn analyze(input: &AnalysisInput, settings: &Settings) -> Result<AnalysisResult> {
    let kite = SourceParser::for_source(Source::Kite, settings)
        .parse(std::slice::from_ref(&input.brokerage))?;
    let tradingview =
        SourceParser::for_source(Source::TradingView, settings).parse(&input.platform)?;

    Ok(assemble(kite, tradingview, settings))
}

/// Build the result from already-parsed sources
pub fn assemble(kite: ParsedSource, tradingview: ParsedSource, settings: &Settings) -> AnalysisResult {
    let reconciliation = reconcile(&kite.summaries, &tradingview.summaries);

    let mut warnings = kite.warnings;
    warnings.extend(tradingview.warnings);
    warnings.extend(reconciliation.warnings);

    let charts = build_charts(
        &kite.summaries,
        &reconciliation.deltas,
        settings.delta_display_limit,
    );
    let delta_stats = delta_stats(&reconciliation.deltas, settings.delta_display_limit);

    info!(
        "Analysis complete: {} deltas, total delta {}, {} warning(s)",
        reconciliation.deltas.len(),
        delta_stats.total_delta,
        warnings.len()
    );

    AnalysisResult {
        kite: SourceReport::build(Source::Kite, kite.summaries, settings),
        tradingview: SourceReport::build(Source::TradingView, tradingview.summaries, settings),
        deltas: reconciliation.deltas,
        delta_stats,
        unmatched: reconciliation.unmatched,
        charts,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use rust_decimal_macros::dec;

    fn kite_table() -> RawTable {
        RawTable::from_strings(
            "pnl.csv",
            &["Symbol", "ISIN", "Quantity", "Buy Value", "Sell Value", "Realized P&L"],
            &[
                &["A", "INE000A01010", "10", "1000", "1500", "500"],
                &["B", "INE000B01010", "5", "1000", "800", "-200"],
                &["K", "", "1", "10", "10", "0"],
            ],
        )
    }

    fn trade_history(name: &str, buy: &str, sell: &str) -> RawTable {
        RawTable::from_strings(
            name,
            &["Date", "Action", "Quantity", "Price"],
            &[&["2024-01-02", "Buy", "1", buy], &["2024-01-05", "Sell", "1", sell]],
        )
    }

    #[test]
    fn test_analyze_end_to_end() {
        let input = AnalysisInput {
            brokerage: kite_table(),
            platform: vec![
                trade_history("A.csv", "1000", "1450"),
                trade_history("B.csv", "1000", "750"),
            ],
        };

        let result = analyze(&input, &Settings::default()).unwrap();

        assert_eq!(result.deltas.len(), 2);
        assert_eq!(result.deltas[0].delta, dec!(50));
        assert_eq!(result.deltas[0].delta_pct.unwrap().round_dp(2), dec!(11.11));
        assert_eq!(result.deltas[1].delta_pct, Some(dec!(20)));
        assert_eq!(result.delta_stats.total_delta, dec!(100));
        assert_eq!(result.kite.stats.total_pnl, dec!(300));
        assert_eq!(result.tradingview.stats.total_pnl, dec!(200));
        assert_eq!(result.unmatched.kite_only.len(), 1);
        assert!(result.warnings.is_empty());
        assert_eq!(result.charts.pnl_chart.data.len(), 2);
    }

    #[test]
    fn test_export_sorted_by_magnitude() {
        let input = AnalysisInput {
            brokerage: kite_table(),
            platform: vec![
                trade_history("A.csv", "1000", "1490"),
                trade_history("B.csv", "1000", "750"),
            ],
        };
        let result = analyze(&input, &Settings::default()).unwrap();
        let rows = result.flat_table("NaN");
        assert_eq!(rows[0].symbol, "B");
        assert_eq!(rows[1].symbol, "A");
    }

    #[test]
    fn test_disjoint_sources_warn_without_failing() {
        let input = AnalysisInput {
            brokerage: kite_table(),
            platform: vec![trade_history("ZZZ.csv", "1", "2")],
        };
        let result = analyze(&input, &Settings::default()).unwrap();
        assert!(result.deltas.is_empty());
        assert!(result.warnings.contains(&Warning::NoMatch));
        assert!(result.delta_stats.largest_delta.is_none());
    }

    #[test]
    fn test_schema_error_aborts_run() {
        let input = AnalysisInput {
            brokerage: RawTable::from_strings("pnl.csv", &["Name", "Qty"], &[&["A", "1"]]),
            platform: vec![trade_history("A.csv", "1", "2")],
        };
        let err = analyze(&input, &Settings::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::Schema { .. }));
    }

    #[test]
    fn test_ranking_size_from_settings() {
        let settings = Settings {
            ranking_size: 1,
            ..Settings::default()
        };
        let input = AnalysisInput {
            brokerage: kite_table(),
            platform: vec![trade_history("A.csv", "1", "2")],
        };
        let result = analyze(&input, &settings).unwrap();
        assert_eq!(result.kite.top.len(), 1);
        assert_eq!(result.kite.top[0].symbol.as_str(), "A");
        assert_eq!(result.kite.bottom[0].symbol.as_str(), "B");
    }
}
